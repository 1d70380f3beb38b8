use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::llm::LlmProvider;
use crate::rag::DocumentStore;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok"
    }))
}

/// Readiness report plus a few operational counters.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let ready = state.engine.ready();
    let products = state.catalog.count_products().await.unwrap_or(0);
    let documents = match &state.documents {
        Some(store) => store
            .count(Some(&state.settings.rag.collection))
            .await
            .unwrap_or(0),
        None => 0,
    };

    Ok(Json(json!({
        "status": if ready { "ready" } else { "initializing" },
        "detail": if ready {
            "The vector store is loaded and ready for queries."
        } else {
            "The vector store is initializing or no file has been uploaded yet."
        },
        "backend": state.provider.as_ref().map(|p| p.name()),
        "products": products,
        "documents": documents,
        "sessions": state.memory.session_count()
    })))
}
