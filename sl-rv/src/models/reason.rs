//! Stable rejection codes
//!
//! Clients should switch on [`ReasonCode`]. The display text travels next
//! to it and keeps the wording older clients match substrings against
//! ("blurry", "dark", "bright", "resolution", "GPS", "confidence",
//! "not clearly visible", "civic issue").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    // Layer 0
    InvalidFile,
    LowResolution,
    TooBlurry,
    TooDark,
    TooBright,
    GpsOutOfRegion,
    PhotoTooOld,
    // Classification and scoring
    LowConfidence,
    NotCivicIssue,
    GpsSpoofing,
    ScoreBelowThreshold,
    // Pipeline
    ProcessingTimeout,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InvalidFile => "INVALID_FILE",
            ReasonCode::LowResolution => "LOW_RESOLUTION",
            ReasonCode::TooBlurry => "TOO_BLURRY",
            ReasonCode::TooDark => "TOO_DARK",
            ReasonCode::TooBright => "TOO_BRIGHT",
            ReasonCode::GpsOutOfRegion => "GPS_OUT_OF_REGION",
            ReasonCode::PhotoTooOld => "PHOTO_TOO_OLD",
            ReasonCode::LowConfidence => "LOW_CONFIDENCE",
            ReasonCode::NotCivicIssue => "NOT_CIVIC_ISSUE",
            ReasonCode::GpsSpoofing => "GPS_SPOOFING",
            ReasonCode::ScoreBelowThreshold => "SCORE_BELOW_THRESHOLD",
            ReasonCode::ProcessingTimeout => "PROCESSING_TIMEOUT",
        }
    }

    /// True for codes produced by the structural (Layer 0) checks
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ReasonCode::InvalidFile
                | ReasonCode::LowResolution
                | ReasonCode::TooBlurry
                | ReasonCode::TooDark
                | ReasonCode::TooBright
                | ReasonCode::GpsOutOfRegion
                | ReasonCode::PhotoTooOld
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reason code paired with its human-readable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub code: ReasonCode,
    pub message: String,
}

impl Reason {
    pub fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
