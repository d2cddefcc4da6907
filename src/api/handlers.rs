use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{ExplainRequest, ExplainResponse, HealthResponse, TtsQuery, TtsRequest};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::explain::DEFAULT_MIME_TYPE;
use crate::tts::OutputFormat;

/// Map a body rejection into the shared error envelope, keeping 413 for
/// bodies over the size limit.
fn json_rejection(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(rejection.body_text())
    } else {
        AppError::BadRequest(rejection.body_text())
    }
}

pub const AUDIO_FORMAT_HEADER: HeaderName = HeaderName::from_static("x-audio-format");

pub async fn tts(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TtsQuery>, QueryRejection>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let Json(request) = payload.map_err(json_rejection)?;

    // Validate input
    let text = match request.text.as_deref() {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(AppError::BadRequest("text is required".into())),
    };

    let format = OutputFormat::resolve(query.format.as_deref())?;
    let settings = request.settings.unwrap_or_default();

    let speech = state
        .tts
        .synthesize(text, &settings, format, state.config.vendor_timeout)
        .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, speech.format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                speech.format.content_disposition(),
            ),
            (AUDIO_FORMAT_HEADER, speech.format.as_str().to_string()),
        ],
        speech.audio,
    )
        .into_response())
}

pub async fn explain(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExplainRequest>, JsonRejection>,
) -> Result<Json<ExplainResponse>, AppError> {
    let Json(request) = payload.map_err(json_rejection)?;

    let image_base64 = match request.image_base64.as_deref() {
        Some(image) if !image.is_empty() => image,
        _ => return Err(AppError::BadRequest("imageBase64 is required".into())),
    };

    let mime_type = request
        .mime_type
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE);

    let explanation = state
        .explain
        .explain(image_base64, mime_type, state.config.vendor_timeout)
        .await?;

    Ok(Json(ExplainResponse { explanation }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
