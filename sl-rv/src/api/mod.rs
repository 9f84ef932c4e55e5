//! HTTP API handlers for sl-rv
//!
//! Report submission over REST plus an SSE stream of pipeline events.

pub mod health;
pub mod reports;
pub mod sse;
pub mod thresholds;

pub use health::health_routes;
pub use reports::report_routes;
pub use sse::pipeline_event_stream;
pub use thresholds::threshold_routes;
