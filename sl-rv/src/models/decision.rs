//! Pipeline run state machine and final decision

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sl_common::events::PipelineState;
use std::time::Duration;
use uuid::Uuid;

use super::classification::ClassificationResult;
use super::gps::GpsVerificationResult;
use super::reason::{Reason, ReasonCode};
use super::validation::ValidationOutcome;

/// Accept/reject verdict for one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    /// 0-100
    pub final_score: u8,
    pub accepted: bool,
    pub reasons: Vec<Reason>,
    /// Summary line for the reporter
    pub message: String,
}

impl FinalDecision {
    /// Layer 0 rejection carrying every structural error
    pub fn rejected_by_validation(outcome: &ValidationOutcome) -> Self {
        let message = outcome
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "Image validation failed".to_string());

        Self {
            final_score: 0,
            accepted: false,
            reasons: outcome.errors.clone(),
            message,
        }
    }

    /// Overall deadline exceeded
    pub fn timed_out(deadline: Duration) -> Self {
        let reason = Reason::new(
            ReasonCode::ProcessingTimeout,
            format!(
                "Processing took longer than {} seconds. Please try submitting again.",
                deadline.as_secs()
            ),
        );
        Self {
            final_score: 0,
            accepted: false,
            message: reason.message.clone(),
            reasons: vec![reason],
        }
    }

    pub fn reason_codes(&self) -> Vec<ReasonCode> {
        self.reasons.iter().map(|r| r.code).collect()
    }

    pub fn has_reason(&self, code: ReasonCode) -> bool {
        self.reasons.iter().any(|r| r.code == code)
    }
}

/// One step of the pipeline state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub submission_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// In-flight pipeline run (owned by exactly one orchestrator task)
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub submission_id: Uuid,
    pub state: PipelineState,
    pub started_at: DateTime<Utc>,
    pub transitions: Vec<StateTransition>,
    pub validation: Option<ValidationOutcome>,
    pub classification: Option<ClassificationResult>,
    pub gps_verification: Option<GpsVerificationResult>,
}

impl PipelineRun {
    pub fn new(submission_id: Uuid) -> Self {
        Self {
            submission_id,
            state: PipelineState::Received,
            started_at: Utc::now(),
            transitions: Vec::new(),
            validation: None,
            classification: None,
            gps_verification: None,
        }
    }

    /// Move to `new_state` if the state machine allows it
    ///
    /// Returns `None` and leaves the run untouched for a backwards or
    /// post-terminal transition.
    pub fn transition_to(&mut self, new_state: PipelineState) -> Option<StateTransition> {
        if !self.state.can_transition_to(new_state) {
            return None;
        }

        let transition = StateTransition {
            submission_id: self.submission_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        self.transitions.push(transition.clone());
        Some(transition)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Close the run with its decision
    pub fn finish(self, decision: FinalDecision) -> PipelineReport {
        PipelineReport {
            submission_id: self.submission_id,
            state: self.state,
            decision,
            validation: self.validation,
            classification: self.classification,
            gps_verification: self.gps_verification,
            transitions: self.transitions,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Everything the pipeline learned about one submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub submission_id: Uuid,
    /// Terminal state reached
    pub state: PipelineState,
    pub decision: FinalDecision,
    pub validation: Option<ValidationOutcome>,
    pub classification: Option<ClassificationResult>,
    pub gps_verification: Option<GpsVerificationResult>,
    pub transitions: Vec<StateTransition>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn visited(&self, state: PipelineState) -> bool {
        self.transitions.iter().any(|t| t.new_state == state)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.validation
            .as_ref()
            .map(|v| v.warnings.clone())
            .unwrap_or_default()
    }
}
