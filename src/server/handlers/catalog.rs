use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequestBody {
    pub path: String,
}

/// Start catalog ingestion for a CSV already on disk.
///
/// Relative paths resolve against the uploads directory. The run itself
/// happens in the background; its outcome lands in the logs.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngestRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = body.path.trim();
    if raw.is_empty() {
        return Err(ApiError::BadRequest("path must not be empty".to_string()));
    }

    let path = PathBuf::from(raw);
    let path = if path.is_absolute() {
        path
    } else {
        state.paths.uploads_dir.join(path)
    };

    if !path.is_file() {
        return Err(ApiError::NotFound(format!(
            "no catalog file at {}",
            path.display()
        )));
    }

    let pipeline = state.ingest.clone();
    let task_path = path.clone();
    tokio::spawn(async move {
        let report = pipeline.run(&task_path).await;
        match &report.error {
            Some(error) => {
                tracing::warn!("ingestion of {} failed: {}", task_path.display(), error)
            }
            None => tracing::info!(
                "ingestion of {} done: {} products created, {} skipped, {} documents indexed",
                task_path.display(),
                report.products_created,
                report.products_skipped,
                report.documents_indexed
            ),
        }
    });

    Ok(Json(json!({
        "status": "accepted",
        "message": "Data ingestion has started in the background.",
        "path": path.display().to_string()
    })))
}
