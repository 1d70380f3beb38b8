use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

const MIN_K: usize = 1;
const MAX_K: usize = 10;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub session_id: String,
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    pub k: Option<usize>,
}

/// Answer one question for a session.
///
/// Intent is classified first; small talk gets a canned reply without
/// touching retrieval or memory. Product questions run the full
/// pipeline and return the answer with its debug context.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChatParams>,
    Json(body): Json<ChatRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let question = body.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }
    let session_id = body.session_id.trim();
    if session_id.is_empty() {
        return Err(ApiError::BadRequest("session_id must not be empty".to_string()));
    }

    let k = params
        .k
        .unwrap_or(state.settings.rag.default_k)
        .clamp(MIN_K, MAX_K);

    let intent = state.classifier.classify(question).await;
    if let Some(reply) = intent.small_talk_response() {
        tracing::info!(
            "session '{}' answered as small talk ({})",
            session_id,
            intent.as_str()
        );
        return Ok(Json(json!({ "answer": reply })));
    }

    let result = state.engine.answer(session_id, question, k).await;
    Ok(Json(json!({
        "answer": result.answer,
        "debug_context": result.debug_context
    })))
}
