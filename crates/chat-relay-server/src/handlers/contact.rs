use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use crate::models::contact::{ContactRequest, ContactResponse};
use crate::services::ContactService;
use crate::utils::error::ApiError;

/// POST /api/contact
pub async fn submit_contact_handler(
    State(contact_service): State<Arc<ContactService>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let message = contact_service.submit(&request).await?;

    Ok(Json(ContactResponse {
        success: true,
        message,
    }))
}
