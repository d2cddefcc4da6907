use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderName, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::handlers;
use crate::auth::{self, AUTH_HEADER};
use crate::cache;
use crate::config::Config;
use crate::error::AppError;
use crate::explain::ExplainService;
use crate::http_client::http_client;
use crate::tts::TtsService;

/// Path prefixes owned by the API. Nothing under them is ever answered with
/// the SPA document.
pub const API_PREFIXES: [&str; 2] = ["/tts", "/explain"];

/// Upper bound for API request bodies. Base64 photos from phones run to
/// several megabytes.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub fn is_api_path(path: &str) -> bool {
    API_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Answers 404 for API-prefixed paths that no route matched, so they never
/// reach the static file service.
async fn api_path_guard(request: Request, next: Next) -> Result<Response, AppError> {
    let path = request.uri().path();
    if is_api_path(path) {
        return Err(AppError::NotFound(path.to_string()));
    }

    Ok(next.run(request).await)
}

pub struct AppState {
    pub config: Config,
    pub tts: TtsService,
    pub explain: ExplainService,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let client = http_client()?;

        Ok(Self {
            tts: TtsService::new(client.clone(), config.elevenlabs.clone()),
            explain: ExplainService::new(client, config.openai.clone()),
            config,
        })
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(AUTH_HEADER)]);

    let api_routes = Router::new()
        .route("/tts", post(handlers::tts))
        .route("/explain", post(handlers::explain))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_token,
        ));

    // Anything that is not an API route is a static file, or the SPA
    // entry document when no such file exists.
    let web_root = &state.config.web_root;
    let static_files = ServiceBuilder::new()
        .layer(middleware::from_fn(api_path_guard))
        .layer(middleware::from_fn(cache::cache_control))
        .service(
            ServeDir::new(web_root)
                .append_index_html_on_directories(true)
                .fallback(ServeFile::new(web_root.join("index.html"))),
        );

    Router::new()
        .merge(api_routes)
        .route("/health", get(handlers::health))
        .fallback_service(static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
