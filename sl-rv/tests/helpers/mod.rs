//! Test Helper Utilities
//!
//! Shared utilities for testing sl-rv

#![allow(dead_code)]

pub mod image_fixtures;
pub mod stubs;

pub use image_fixtures::{flat_png, jpeg_with_gps, noise_jpeg, noise_png, ExifFixture};
pub use stubs::{test_config, StubGeocoder, StubModel};

use sl_common::events::EventBus;
use sl_rv::config::ServiceConfig;
use sl_rv::services::PipelineOrchestrator;
use std::sync::Arc;

/// Lahore city centre, inside the service region
pub const LAHORE: (f64, f64) = (31.5204, 74.3587);

/// Orchestrator wired to stubs
pub fn orchestrator(
    config: &ServiceConfig,
    model: Arc<StubModel>,
    geocoder: Arc<StubGeocoder>,
) -> PipelineOrchestrator {
    PipelineOrchestrator::with_services(config, model, geocoder, EventBus::new(256))
        .expect("valid test config")
}
