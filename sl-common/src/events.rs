//! Event types for the StreetLight event system
//!
//! Provides the pipeline state machine states, the pipeline event enum and
//! the EventBus used to broadcast them (SSE, audit logging).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Report validation pipeline state
///
/// `RECEIVED → VALIDATING → (REJECTED_LAYER0 | CLASSIFYING) → VERIFYING_GPS
/// → SCORING → (ACCEPTED | REJECTED)`
///
/// Any non-terminal state may also move to `REJECTED` (deadline exceeded)
/// or `UNPROCESSABLE` (classifier unavailable, internal failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Received,
    Validating,
    RejectedLayer0,
    Classifying,
    VerifyingGps,
    Scoring,
    Accepted,
    Rejected,
    Unprocessable,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Received => "RECEIVED",
            PipelineState::Validating => "VALIDATING",
            PipelineState::RejectedLayer0 => "REJECTED_LAYER0",
            PipelineState::Classifying => "CLASSIFYING",
            PipelineState::VerifyingGps => "VERIFYING_GPS",
            PipelineState::Scoring => "SCORING",
            PipelineState::Accepted => "ACCEPTED",
            PipelineState::Rejected => "REJECTED",
            PipelineState::Unprocessable => "UNPROCESSABLE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::RejectedLayer0
                | PipelineState::Accepted
                | PipelineState::Rejected
                | PipelineState::Unprocessable
        )
    }

    /// Transitions only ever move forward; terminal states are final.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Rejected | Unprocessable) {
            return true;
        }
        matches!(
            (self, next),
            (Received, Validating)
                | (Validating, RejectedLayer0)
                | (Validating, Classifying)
                | (Classifying, VerifyingGps)
                | (VerifyingGps, Scoring)
                | (Scoring, Accepted)
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// StreetLight pipeline events
///
/// Broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A submission entered the pipeline
    SubmissionReceived {
        submission_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Pipeline state machine moved forward
    StateChanged {
        submission_id: Uuid,
        old_state: PipelineState,
        new_state: PipelineState,
        timestamp: DateTime<Utc>,
    },

    /// External location lookup failed; verification continued best-effort
    LookupDegraded {
        submission_id: Uuid,
        /// "reverse_geocode" or "landmark_search"
        operation: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Final accept/reject decision reached
    SubmissionDecided {
        submission_id: Uuid,
        accepted: bool,
        final_score: u8,
        reasons: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Submission could not be processed; client must retry
    SubmissionUnprocessable {
        submission_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::SubmissionReceived { .. } => "SubmissionReceived",
            PipelineEvent::StateChanged { .. } => "StateChanged",
            PipelineEvent::LookupDegraded { .. } => "LookupDegraded",
            PipelineEvent::SubmissionDecided { .. } => "SubmissionDecided",
            PipelineEvent::SubmissionUnprocessable { .. } => "SubmissionUnprocessable",
        }
    }

    pub fn submission_id(&self) -> Uuid {
        match self {
            PipelineEvent::SubmissionReceived { submission_id, .. }
            | PipelineEvent::StateChanged { submission_id, .. }
            | PipelineEvent::LookupDegraded { submission_id, .. }
            | PipelineEvent::SubmissionDecided { submission_id, .. }
            | PipelineEvent::SubmissionUnprocessable { submission_id, .. } => *submission_id,
        }
    }
}

/// Broadcast channel for pipeline events
///
/// Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
