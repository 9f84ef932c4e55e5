//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Backend answering classification requests
    pub classifier_model: String,
    pub geocoder: GeocoderHealth,
    /// Live `/events` subscribers
    pub event_subscribers: usize,
    /// Last unprocessable submission, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Shared geocoding budget as seen by this process
#[derive(Debug, Serialize)]
pub struct GeocoderHealth {
    pub requests_per_second: u32,
    /// Rate limiter slots handed out since startup
    pub requests_granted: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;
    let limiter = state.orchestrator.gps_verifier().geocoder().limiter();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "sl-rv".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        classifier_model: state.orchestrator.model_name().to_string(),
        geocoder: GeocoderHealth {
            requests_per_second: limiter.requests_per_second(),
            requests_granted: limiter.granted(),
        },
        event_subscribers: state.event_bus.subscriber_count(),
        last_error: state.last_error.read().await.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
