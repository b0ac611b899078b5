mod automation;
mod browser;
mod config;
mod errors;
mod llm_client;
mod logs;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::logs::LogHub;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (credentials stay optional until a run starts)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting easy-apply automation API v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Log fan-out hub, shared by the pipeline task and every SSE subscriber
    let hub = LogHub::new();

    // AI answer filling is an optional extension; without a key the
    // pipeline uses canned answers only
    let llm = config.anthropic_api_key.clone().map(LlmClient::new);
    match &llm {
        Some(_) => info!("LLM client initialized (model: {})", llm_client::MODEL),
        None => info!("ANTHROPIC_API_KEY not set; AI answer filling disabled"),
    }

    let state = AppState {
        hub,
        llm,
        run_active: Arc::new(AtomicBool::new(false)),
        config: config.clone(),
    };

    // Only the local frontend may call us, and only with GET/POST
    let cors_origin = config
        .frontend_origin
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("FRONTEND_ORIGIN is not a valid origin: {e}"))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST]);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
