//! Pipeline orchestration
//!
//! Drives one submission through the state machine:
//!
//! ```text
//! RECEIVED → VALIDATING → (REJECTED_LAYER0 | CLASSIFYING) → VERIFYING_GPS
//!          → SCORING → (ACCEPTED | REJECTED)
//! ```
//!
//! Layer 0 runs first so a rejected photo never costs a classifier or
//! geocoding call. Classification and EXIF extraction then run together on
//! the same shared image buffer. The whole run is bounded by one deadline;
//! exceeding it rejects the submission with `PROCESSING_TIMEOUT`.
//!
//! Each run owns its own [`PipelineRun`]. The geocoding rate limiter inside
//! the [`GpsVerifier`] is the only state shared between concurrent runs.

use chrono::Utc;
use sl_common::events::{EventBus, PipelineEvent, PipelineState};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::ServiceConfig;
use crate::models::{FinalDecision, PipelineReport, PipelineRun, ReportSubmission};
use crate::services::classifier::{
    ClassificationModel, ClassifierError, HttpModelClient, IssueClassifier,
};
use crate::services::exif_reader::ExifGpsReader;
use crate::services::geocoder::{GeocodingService, OsmClient, RateLimitedGeocoder};
use crate::services::gps_verifier::GpsVerifier;
use crate::services::input_validator::InputValidator;
use crate::services::rate_limiter::RateLimiter;
use crate::services::scoring::ScoringEngine;

/// Failures that make a submission unprocessable
///
/// The client must resubmit; such a submission is never approved.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),
}

pub struct PipelineOrchestrator {
    validator: Arc<InputValidator>,
    classifier: IssueClassifier,
    exif_reader: ExifGpsReader,
    gps_verifier: GpsVerifier,
    scoring: ScoringEngine,
    event_bus: EventBus,
    deadline: Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        validator: InputValidator,
        classifier: IssueClassifier,
        gps_verifier: GpsVerifier,
        scoring: ScoringEngine,
        event_bus: EventBus,
        deadline: Duration,
    ) -> Self {
        Self {
            validator: Arc::new(validator),
            classifier,
            exif_reader: ExifGpsReader::new(),
            gps_verifier,
            scoring,
            event_bus,
            deadline,
        }
    }

    /// Build every stage from configuration around the given external services
    ///
    /// Creates the process-wide geocoding rate limiter. Call once per process.
    pub fn with_services(
        config: &ServiceConfig,
        model: Arc<dyn ClassificationModel>,
        geocoding: Arc<dyn GeocodingService>,
        event_bus: EventBus,
    ) -> sl_common::Result<Self> {
        let limiter = Arc::new(RateLimiter::new(
            config.geocoder.requests_per_second,
            config.geocoder.burst,
        )?);
        let geocoder = Arc::new(RateLimitedGeocoder::new(
            geocoding,
            limiter,
            config.geocoder.timeout(),
            config.geocoder.search_radius_m,
        ));

        Ok(Self::new(
            InputValidator::new(config.validation.clone(), config.region),
            IssueClassifier::new(model, config.classifier.timeout()),
            GpsVerifier::new(geocoder, config.gps.clone()),
            ScoringEngine::new(config.scoring.clone()),
            event_bus,
            config.pipeline.deadline(),
        ))
    }

    /// Build the production pipeline: HTTP model server plus OpenStreetMap
    pub fn from_config(config: &ServiceConfig, event_bus: EventBus) -> sl_common::Result<Self> {
        let model = HttpModelClient::new(&config.classifier)
            .map_err(|e| sl_common::Error::Config(format!("classifier client: {}", e)))?;
        let geocoding = OsmClient::new(&config.geocoder)
            .map_err(|e| sl_common::Error::Config(format!("geocoder client: {}", e)))?;

        info!(
            model = model.name(),
            geocoder = geocoding.name(),
            requests_per_second = config.geocoder.requests_per_second,
            deadline_secs = config.pipeline.deadline_secs,
            "Pipeline orchestrator initialized"
        );

        Self::with_services(config, Arc::new(model), Arc::new(geocoding), event_bus)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn model_name(&self) -> &str {
        self.classifier.model_name()
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }

    pub fn gps_verifier(&self) -> &GpsVerifier {
        &self.gps_verifier
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// Run one submission to a terminal state
    ///
    /// Returns the report for every accept/reject outcome, including a
    /// deadline overrun. Returns `Err` only when the submission is
    /// unprocessable (classifier unavailable or timed out).
    pub async fn submit(&self, submission: ReportSubmission) -> Result<PipelineReport, PipelineError> {
        let submission_id = submission.submission_id;
        let span = info_span!("submission", submission_id = %submission_id);

        async move {
            info!(
                image_bytes = submission.image.len(),
                lat = submission.coordinates.lat,
                lon = submission.coordinates.lon,
                "Submission received"
            );
            self.event_bus.emit_lossy(PipelineEvent::SubmissionReceived {
                submission_id,
                timestamp: Utc::now(),
            });

            let mut run = PipelineRun::new(submission_id);
            let outcome = tokio::time::timeout(self.deadline, self.drive(&mut run, &submission)).await;

            let decision = match outcome {
                Ok(Ok(decision)) => decision,
                Ok(Err(e)) => {
                    error!(error = %e, "Submission unprocessable");
                    self.advance(&mut run, PipelineState::Unprocessable);
                    self.event_bus.emit_lossy(PipelineEvent::SubmissionUnprocessable {
                        submission_id,
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(e);
                }
                Err(_) => {
                    warn!(
                        deadline_secs = self.deadline.as_secs(),
                        state = %run.state,
                        "Processing deadline exceeded"
                    );
                    self.advance(&mut run, PipelineState::Rejected);
                    FinalDecision::timed_out(self.deadline)
                }
            };

            info!(
                state = %run.state,
                accepted = decision.accepted,
                final_score = decision.final_score,
                "Submission decided"
            );
            self.event_bus.emit_lossy(PipelineEvent::SubmissionDecided {
                submission_id,
                accepted: decision.accepted,
                final_score: decision.final_score,
                reasons: decision.reasons.iter().map(|r| r.code.to_string()).collect(),
                timestamp: Utc::now(),
            });

            Ok(run.finish(decision))
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        run: &mut PipelineRun,
        submission: &ReportSubmission,
    ) -> Result<FinalDecision, PipelineError> {
        // Layer 0
        self.advance(run, PipelineState::Validating);
        let validator = Arc::clone(&self.validator);
        let to_validate = submission.clone();
        let validation = tokio::task::spawn_blocking(move || {
            validator.validate_at(&to_validate, to_validate.received_at)
        })
        .await
        .map_err(|e| PipelineError::TaskFailed(e.to_string()))?;

        run.validation = Some(validation.clone());
        if !validation.passed {
            info!(
                errors = ?validation.error_codes(),
                quality = validation.overall_quality,
                "Layer 0 rejected submission"
            );
            self.advance(run, PipelineState::RejectedLayer0);
            return Ok(FinalDecision::rejected_by_validation(&validation));
        }

        // Classification and EXIF extraction read the same buffer concurrently
        self.advance(run, PipelineState::Classifying);
        let reader = self.exif_reader;
        let exif_bytes = submission.image.clone();
        let (classification, metadata) = tokio::join!(
            self.classifier.classify(submission.image.clone()),
            tokio::task::spawn_blocking(move || reader.read_lenient(&exif_bytes)),
        );
        let classification = classification?;
        let metadata = metadata.map_err(|e| PipelineError::TaskFailed(e.to_string()))?;
        run.classification = Some(classification.clone());

        self.advance(run, PipelineState::VerifyingGps);
        let gps = self
            .gps_verifier
            .verify(metadata.gps, submission.coordinates)
            .await;
        for lookup_error in &gps.lookup_errors {
            let (operation, error) = lookup_error
                .split_once(": ")
                .unwrap_or(("geocoding", lookup_error.as_str()));
            self.event_bus.emit_lossy(PipelineEvent::LookupDegraded {
                submission_id: run.submission_id,
                operation: operation.to_string(),
                error: error.to_string(),
                timestamp: Utc::now(),
            });
        }
        run.gps_verification = Some(gps.clone());

        self.advance(run, PipelineState::Scoring);
        let decision = self.scoring.score(&classification, &gps);
        if decision.accepted {
            self.advance(run, PipelineState::Accepted);
        } else {
            self.advance(run, PipelineState::Rejected);
        }
        Ok(decision)
    }

    fn advance(&self, run: &mut PipelineRun, state: PipelineState) {
        match run.transition_to(state) {
            Some(transition) => {
                info!(
                    old_state = %transition.old_state,
                    new_state = %transition.new_state,
                    "State transition"
                );
                self.event_bus.emit_lossy(PipelineEvent::StateChanged {
                    submission_id: transition.submission_id,
                    old_state: transition.old_state,
                    new_state: transition.new_state,
                    timestamp: transition.transitioned_at,
                });
            }
            None => {
                warn!(from = %run.state, to = %state, "Ignoring illegal state transition");
            }
        }
    }
}

