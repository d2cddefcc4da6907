use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::routes::AppState;
use crate::error::AppError;

pub const AUTH_HEADER: &str = "x-auth-token";

/// Shared-secret check. No configured token means auth is disabled.
pub fn is_authorized(expected: Option<&str>, provided: Option<&str>) -> bool {
    match expected {
        None | Some("") => true,
        Some(token) => provided == Some(token),
    }
}

/// Gate for the API routes. Runs before the body is extracted, so a
/// rejected request never reaches a vendor.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok());

    if !is_authorized(state.config.auth_token.as_deref(), provided) {
        tracing::warn!("Rejected {} without a valid auth token", request.uri().path());
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
