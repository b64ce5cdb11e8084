use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use tower_http::trace::TraceLayer;

use structex_core::config_file;
use structex_core::{ChatCompletionsClient, Config};
use structex_pdf_mupdf::MupdfBackend;

mod handlers;
mod logging;
mod models;
mod settings;
mod state;
mod upload;

use settings::ServerSettings;
use state::AppState;

pub const EXTRACT_ROUTE: &str = "/api/v1/extract/";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let file = config_file::load_config()?;
    let settings = ServerSettings::from_file(&file, std::env::var("STRUCTEX_BIND").ok())?;
    let _log_guard = logging::init(&settings)?;

    let config =
        Config::from_file(&file).with_api_key_fallback(std::env::var("GROQ_API_KEY").ok());
    if config.api_key.is_none() {
        tracing::warn!("no API key configured; set GROQ_API_KEY or [llm].api_key");
    }
    tracing::info!(?config, "model configuration");

    let state = Arc::new(AppState {
        backend: Arc::new(MupdfBackend::new().with_max_pages(settings.max_pages)),
        model: Arc::new(ChatCompletionsClient::from_config(&config)),
    });

    let app = router(state, settings.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    tracing::info!("listening on http://{}", settings.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(EXTRACT_ROUTE, post(handlers::extract::extract))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
