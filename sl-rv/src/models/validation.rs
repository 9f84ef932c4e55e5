//! Layer 0 validation outcome

use serde::{Deserialize, Serialize};

use super::reason::{Reason, ReasonCode};

/// Individual Layer 0 check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    FileSize,
    FileValidity,
    DimensionLimits,
    AspectRatio,
    Resolution,
    Blur,
    Brightness,
    Content,
    Timestamp,
    Screenshot,
    GpsRegion,
}

impl CheckKind {
    /// Weight of this check in the overall quality score
    pub fn weight(&self) -> f64 {
        match self {
            CheckKind::FileSize => 2.0,
            CheckKind::FileValidity => 2.0,
            CheckKind::DimensionLimits => 2.0,
            CheckKind::AspectRatio => 1.5,
            CheckKind::Resolution => 1.5,
            CheckKind::Blur => 1.8,
            CheckKind::Brightness => 1.5,
            CheckKind::Content => 1.7,
            CheckKind::Timestamp => 0.8,
            CheckKind::Screenshot => 0.5,
            CheckKind::GpsRegion => 1.2,
        }
    }
}

/// Result of one check, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub check: CheckKind,
    /// False for both rejecting and warning-only failures
    pub passed: bool,
    /// Quality score 0-100
    pub score: f64,
    pub message: String,
    /// Set when the check rejects the submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ReasonCode>,
}

impl CheckRecord {
    pub fn pass(check: CheckKind, score: f64, message: impl Into<String>) -> Self {
        Self {
            check,
            passed: true,
            score: score.clamp(0.0, 100.0),
            message: message.into(),
            failure: None,
        }
    }

    pub fn fail(check: CheckKind, code: ReasonCode, score: f64, message: impl Into<String>) -> Self {
        Self {
            check,
            passed: false,
            score: score.clamp(0.0, 100.0),
            message: message.into(),
            failure: Some(code),
        }
    }

    /// Failed check that only warns; the message lands in the outcome's warnings
    pub fn warn(check: CheckKind, score: f64, message: impl Into<String>) -> Self {
        Self {
            check,
            passed: false,
            score: score.clamp(0.0, 100.0),
            message: message.into(),
            failure: None,
        }
    }

    pub fn is_warning(&self) -> bool {
        !self.passed && self.failure.is_none()
    }
}

/// Complete Layer 0 result
///
/// Built once from the full list of check records and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    /// Failures in check order
    pub errors: Vec<Reason>,
    pub warnings: Vec<String>,
    pub checks: Vec<CheckRecord>,
    /// Weighted mean of check scores, 0-100
    pub overall_quality: f64,
}

impl ValidationOutcome {
    /// Warning-only records are appended to `warnings` in check order
    pub fn from_checks(checks: Vec<CheckRecord>, mut warnings: Vec<String>) -> Self {
        warnings.extend(
            checks
                .iter()
                .filter(|c| c.is_warning())
                .map(|c| c.message.clone()),
        );
        let errors: Vec<Reason> = checks
            .iter()
            .filter_map(|c| c.failure.map(|code| Reason::new(code, c.message.clone())))
            .collect();

        let total_weight: f64 = checks.iter().map(|c| c.check.weight()).sum();
        let overall_quality = if total_weight > 0.0 {
            let weighted: f64 = checks.iter().map(|c| c.score * c.check.weight()).sum();
            ((weighted / total_weight) * 10.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            passed: errors.is_empty(),
            errors,
            warnings,
            checks,
            overall_quality,
        }
    }

    pub fn error_codes(&self) -> Vec<ReasonCode> {
        self.errors.iter().map(|e| e.code).collect()
    }

    pub fn has_error(&self, code: ReasonCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}
