use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Server misconfigured: {0}")]
    Misconfigured(&'static str),

    /// The vendor answered with a non-success status; relayed as-is.
    #[error("{error} ({status}): {detail}")]
    Vendor {
        status: StatusCode,
        error: &'static str,
        detail: String,
    },

    /// Anything else that went wrong while talking to a vendor, timeouts included.
    #[error("{error}: {detail}")]
    Upstream { error: &'static str, detail: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFound(path) => (StatusCode::NOT_FOUND, "Not found".to_string(), Some(path)),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large".to_string(),
                Some(msg),
            ),
            AppError::Misconfigured(what) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server misconfigured: {}", what),
                None,
            ),
            AppError::Vendor {
                status,
                error,
                detail,
            } => (status, error.to_string(), Some(detail)),
            AppError::Upstream { error, detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error.to_string(),
                Some(detail),
            ),
        };

        tracing::error!(
            "Request failed: {} - {} {}",
            status.as_u16(),
            error,
            detail.as_deref().unwrap_or("")
        );

        (status, Json(ErrorResponse { error, detail })).into_response()
    }
}
