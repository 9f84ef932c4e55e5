//! Pipeline components
//!
//! Layer 0 validation, EXIF reading, rate-limited geocoding, GPS
//! verification, classification with severity, scoring, and the
//! orchestrator that ties them together.

pub mod classifier;
pub mod exif_reader;
pub mod geocoder;
pub mod gps_verifier;
pub mod image_metrics;
pub mod input_validator;
pub mod orchestrator;
pub mod rate_limiter;
pub mod scoring;
pub mod severity;

pub use classifier::{ClassificationModel, ClassifierError, HttpModelClient, IssueClassifier};
pub use exif_reader::{ExifError, ExifGpsReader};
pub use geocoder::{GeocodeError, GeocodingService, Lookup, OsmClient, RateLimitedGeocoder};
pub use gps_verifier::{assess_distance, GpsVerifier, LandmarkEvidence};
pub use input_validator::InputValidator;
pub use orchestrator::{PipelineError, PipelineOrchestrator};
pub use rate_limiter::RateLimiter;
pub use scoring::ScoringEngine;
