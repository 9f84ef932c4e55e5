//! sl-rv - StreetLight report validation microservice
//!
//! **Module Identity:**
//! - Name: sl-rv (Report Validation)
//! - Default port: 5780
//!
//! Validates citizen civic-issue reports (photo plus coordinates) and
//! decides whether each one is trustworthy enough to accept.

use anyhow::{Context, Result};
use clap::Parser;
use sl_common::config::{load_or_default, resolve_config_path};
use sl_common::events::EventBus;
use sl_common::logging::init_tracing;
use std::path::PathBuf;
use tracing::info;

use sl_rv::config::{ServiceConfig, CONFIG_ENV_VAR, CONFIG_FILE_NAME};
use sl_rv::services::PipelineOrchestrator;
use sl_rv::AppState;

/// Command-line arguments for sl-rv
#[derive(Parser, Debug)]
#[command(name = "sl-rv")]
#[command(about = "StreetLight civic report validation service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "SL_RV_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Step 1: Configuration (CLI > env > config dir > defaults)
    let resolved = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR, CONFIG_FILE_NAME);
    let config_path = resolved.as_ref().map(|(path, _)| path.clone());
    let mut config: ServiceConfig = load_or_default(resolved)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    config.validate()?;

    // Step 2: Logging
    init_tracing(&config.logging)?;

    info!("Starting sl-rv (Report Validation) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }

    // Step 3: Pipeline (shared rate limiter and HTTP clients are built once here)
    let event_bus = EventBus::new(config.pipeline.event_capacity);
    let orchestrator = PipelineOrchestrator::from_config(&config, event_bus)?;

    let addr = format!("{}:{}", config.bind_address, config.port);
    let state = AppState::new(orchestrator, config);
    let app = sl_rv::build_router(state);

    // Step 4: Serve
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("sl-rv stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
