use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod cache;
mod config;
mod error;
mod explain;
mod http_client;
mod tts;

use api::routes::{create_router, AppState};
use config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration from environment, read once
    let config = Config::from_env()?;
    let addr = config.listen_addr()?;

    tracing::info!("Lecture Voice Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);
    tracing::info!("Web root: {}", config.web_root.display());
    tracing::info!(
        "Vendor timeout: {}s",
        config.vendor_timeout.as_secs()
    );

    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN is not set, API routes are unauthenticated");
    }
    if config.elevenlabs.api_key.is_none() || config.elevenlabs.voice_id.is_none() {
        tracing::warn!("ElevenLabs credentials are not set, /tts will fail");
    }
    if config.openai.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set, /explain will fail");
    }

    // Create app state
    let state = Arc::new(AppState::new(config)?);

    // Create router
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
