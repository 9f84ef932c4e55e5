//! Active thresholds
//!
//! GET /thresholds exposes the decision constants so clients can explain
//! rejections without hard-coding them.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sl_common::RegionBounds;

use crate::config::{GpsSettings, ScoringSettings, ValidationSettings};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ThresholdsResponse {
    pub validation: ValidationSettings,
    pub gps: GpsSettings,
    pub scoring: ScoringSettings,
    pub region: RegionBounds,
    pub deadline_secs: u64,
}

/// GET /thresholds
pub async fn get_thresholds(State(state): State<AppState>) -> Json<ThresholdsResponse> {
    let config = &state.config;
    Json(ThresholdsResponse {
        validation: config.validation.clone(),
        gps: config.gps.clone(),
        scoring: config.scoring.clone(),
        region: config.region,
        deadline_secs: config.pipeline.deadline_secs,
    })
}

pub fn threshold_routes() -> Router<AppState> {
    Router::new().route("/thresholds", get(get_thresholds))
}
