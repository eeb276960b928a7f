use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::models::chat::{ChatRequest, ChatResponse};
use crate::services::chat_service::{ChatInput, ChatService};
use crate::utils::error::ApiError;

/// Header carrying the chat platform session key
pub const USER_KEY_HEADER: &str = "x-user-key";

/// POST /api/chat
pub async fn send_message_handler(
    State(chat_service): State<Arc<ChatService>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let user_key = headers
        .get(USER_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let request_id = Uuid::new_v4();
    let span = info_span!("chat_request", %request_id);

    span.in_scope(|| {
        info!(
            "Chat request: conversation={:?}, has_key={}, message_len={}",
            request.conversation_id,
            user_key.is_some(),
            request.message.len()
        )
    });

    let outcome = chat_service
        .handle_message(ChatInput {
            message: request.message,
            user_key,
            user_id: request.user_id,
            conversation_id: request.conversation_id,
        })
        .instrument(span)
        .await?;

    Ok(Json(ChatResponse::from(outcome)))
}

/// DELETE /api/conversations/{conversation_id}/cache
pub async fn invalidate_cache_handler(
    State(chat_service): State<Arc<ChatService>>,
    Path(conversation_id): Path<String>,
) -> StatusCode {
    chat_service.gateway().invalidate(&conversation_id);
    StatusCode::NO_CONTENT
}
