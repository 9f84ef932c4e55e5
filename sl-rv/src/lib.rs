//! sl-rv library interface
//!
//! Civic report validation: Layer 0 input checks, issue classification,
//! GPS cross-verification and trust scoring behind an axum HTTP surface.
//! Exposed as a library for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sl_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::services::PipelineOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Pipeline shared by every request
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub config: Arc<ServiceConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(orchestrator: PipelineOrchestrator, config: ServiceConfig) -> Self {
        let event_bus = orchestrator.event_bus().clone();
        Self {
            orchestrator: Arc::new(orchestrator),
            event_bus,
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let body_limit = state.config.pipeline.max_request_bytes;

    Router::new()
        .merge(api::report_routes().layer(DefaultBodyLimit::max(body_limit)))
        .merge(api::threshold_routes())
        .merge(api::health_routes())
        .route("/events", get(api::pipeline_event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
