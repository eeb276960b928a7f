use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    /// Fatal upstream failure; `code` is stable and safe to expose
    #[error("Upstream error [{code}]: {message}")]
    Upstream { code: &'static str, message: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, fields) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None)
            }
            ApiError::Validation { message, fields } => {
                tracing::warn!("Validation failed: {} ({:?})", message, fields.keys());
                let fields = (!fields.is_empty()).then_some(fields);
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, fields)
            }
            // Already logged with its cause where the upstream call failed
            ApiError::Upstream { code, message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, code, message, None)
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            fields,
        });

        (status, body).into_response()
    }
}
