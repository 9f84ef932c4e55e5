//! Data models for sl-rv (Report Validation)
//!
//! Every value here is created and consumed inside a single pipeline run.

pub mod classification;
pub mod decision;
pub mod gps;
pub mod reason;
pub mod response;
pub mod submission;
pub mod validation;

pub use classification::{ClassificationResult, IssueClass, ModelPrediction, Severity};
pub use decision::{FinalDecision, PipelineReport, PipelineRun, StateTransition};
pub use gps::{Address, GpsStatus, GpsVerificationResult, Landmark, PhotoGps, PhotoMetadata};
pub use reason::{Reason, ReasonCode};
pub use response::{AcceptedResponse, GpsVerificationSummary, RejectedResponse, ReportResponse};
pub use submission::ReportSubmission;
pub use validation::{CheckKind, CheckRecord, ValidationOutcome};
