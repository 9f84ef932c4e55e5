//! Final score and accept/reject decision
//!
//! `final_score = clamp(round(confidence * 100) + gps_adjustment, 0, 100)`.
//! A report is accepted at or above the threshold unless the classifier
//! says it is not a civic issue.

use tracing::info;

use crate::config::ScoringSettings;
use crate::models::{
    ClassificationResult, FinalDecision, GpsStatus, GpsVerificationResult, IssueClass, Reason,
    ReasonCode,
};

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    settings: ScoringSettings,
}

impl ScoringEngine {
    pub fn new(settings: ScoringSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    pub fn score(
        &self,
        classification: &ClassificationResult,
        gps: &GpsVerificationResult,
    ) -> FinalDecision {
        let final_score = final_score(classification.confidence, gps.score_adjustment);
        let civic_issue = classification.predicted_class.is_civic_issue();
        let accepted = civic_issue && final_score >= self.settings.accept_threshold;

        let mut reasons = Vec::new();
        let pct = classification.confidence * 100.0;

        if !civic_issue {
            reasons.push(Reason::new(
                ReasonCode::NotCivicIssue,
                "This image is not a civic issue report: it doesn't appear to show a pothole or garbage. \
                 Please upload a clear photo of a pothole or garbage pile.",
            ));
        } else if classification.confidence < self.settings.min_confidence {
            reasons.push(Reason::new(
                ReasonCode::LowConfidence,
                format!(
                    "Low confidence detection ({:.1}%). The {} is not clearly visible. \
                     Please try taking the photo again from a different angle with better lighting.",
                    pct, classification.predicted_class
                ),
            ));
        }

        if gps.is_spoofed {
            reasons.push(Reason::new(
                ReasonCode::GpsSpoofing,
                format!(
                    "GPS SPOOFING DETECTED: The photo's location differs from your submitted location by {:.2} km. \
                     Please ensure you're submitting accurate coordinates. Penalty applied: {} points.",
                    gps.distance_km.unwrap_or_default(),
                    gps.score_adjustment
                ),
            ));
        }

        if civic_issue && !accepted {
            reasons.push(Reason::new(
                ReasonCode::ScoreBelowThreshold,
                format!(
                    "Final score {} is below the acceptance threshold of {} \
                     (AI confidence {:.1}%, GPS adjustment {:+}).",
                    final_score, self.settings.accept_threshold, pct, gps.score_adjustment
                ),
            ));
        }

        let message = if accepted {
            acceptance_message(classification, gps)
        } else {
            reasons
                .first()
                .map(|r| r.message.clone())
                .unwrap_or_else(|| "Report rejected".to_string())
        };

        info!(
            final_score,
            accepted,
            confidence = classification.confidence,
            gps_adjustment = gps.score_adjustment,
            reasons = ?reasons.iter().map(|r| r.code).collect::<Vec<_>>(),
            "Scored submission"
        );

        FinalDecision {
            final_score,
            accepted,
            reasons,
            message,
        }
    }
}

/// Clamped 0-100 score
pub fn final_score(confidence: f64, gps_adjustment: i32) -> u8 {
    let base = if confidence.is_finite() {
        (confidence.clamp(0.0, 1.0) * 100.0).round() as i64
    } else {
        0
    };
    (base + gps_adjustment as i64).clamp(0, 100) as u8
}

fn acceptance_message(classification: &ClassificationResult, gps: &GpsVerificationResult) -> String {
    let pct = classification.confidence * 100.0;
    let quality = if pct >= 90.0 {
        "Clear"
    } else if pct >= 70.0 {
        "Good"
    } else {
        "Acceptable"
    };
    let class = match classification.predicted_class {
        IssueClass::Pothole => "pothole",
        IssueClass::Garbage => "garbage",
        IssueClass::Other => "issue",
    };

    let mut message = format!("{} {} detected with {:.1}% confidence.", quality, class, pct);
    match gps.status {
        GpsStatus::Verified => message.push_str(" Location verified with nearby landmarks."),
        GpsStatus::GoodMatch | GpsStatus::Degraded => {
            message.push_str(" Location matches submitted coordinates.")
        }
        GpsStatus::MinorMismatch => message.push_str(&format!(
            " Minor location mismatch ({:.2} km).",
            gps.distance_km.unwrap_or_default()
        )),
        GpsStatus::NoGpsInPhoto | GpsStatus::Spoofing => {}
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use sl_common::Coordinates;

    fn engine() -> ScoringEngine {
        ScoringEngine::new(ScoringSettings::default())
    }

    fn classification(class: IssueClass, confidence: f64) -> ClassificationResult {
        ClassificationResult {
            predicted_class: class,
            confidence,
            severity: class.is_civic_issue().then_some(Severity::Medium),
        }
    }

    fn gps(status: GpsStatus, adjustment: i32, distance_km: Option<f64>) -> GpsVerificationResult {
        let mut result = GpsVerificationResult::no_photo_gps(Coordinates::new(31.52, 74.35));
        result.has_photo_gps = distance_km.is_some();
        result.status = status;
        result.score_adjustment = adjustment;
        result.distance_km = distance_km;
        result.is_spoofed = status == GpsStatus::Spoofing;
        result
    }

    #[test]
    fn test_final_score_clamped() {
        assert_eq!(final_score(0.925, 10), 100);
        assert_eq!(final_score(0.2, -50), 0);
        assert_eq!(final_score(0.804, 0), 80);
        assert_eq!(final_score(f64::NAN, 10), 10);
        for conf in [0.0, 0.3, 0.5, 0.77, 1.0] {
            for adj in [-50, -10, -3, 0, 10] {
                assert!(final_score(conf, adj) <= 100);
            }
        }
    }

    #[test]
    fn test_scenario_verified_high_confidence() {
        let d = engine().score(
            &classification(IssueClass::Pothole, 0.925),
            &gps(GpsStatus::Verified, 10, Some(0.067)),
        );
        assert_eq!(d.final_score, 100);
        assert!(d.accepted);
        assert!(d.reasons.is_empty());
        assert_eq!(
            d.message,
            "Clear pothole detected with 92.5% confidence. Location verified with nearby landmarks."
        );
    }

    #[test]
    fn test_scenario_spoofed() {
        let d = engine().score(
            &classification(IssueClass::Garbage, 0.80),
            &gps(GpsStatus::Spoofing, -50, Some(6.0)),
        );
        assert_eq!(d.final_score, 30);
        assert!(!d.accepted);
        assert_eq!(
            d.reason_codes(),
            vec![ReasonCode::GpsSpoofing, ReasonCode::ScoreBelowThreshold]
        );
        assert!(d.message.contains("GPS"));
        assert!(d.message.contains("location"));
        assert!(d.message.contains("6.00 km"));
    }

    #[test]
    fn test_other_never_accepted() {
        let d = engine().score(
            &classification(IssueClass::Other, 0.99),
            &gps(GpsStatus::Verified, 10, Some(0.1)),
        );
        assert_eq!(d.final_score, 100);
        assert!(!d.accepted);
        assert_eq!(d.reason_codes(), vec![ReasonCode::NotCivicIssue]);
        assert!(d.message.contains("not a civic issue"));
    }

    #[test]
    fn test_low_confidence_reason() {
        let d = engine().score(
            &classification(IssueClass::Pothole, 0.42),
            &gps(GpsStatus::NoGpsInPhoto, 0, None),
        );
        assert!(!d.accepted);
        assert_eq!(d.reasons[0].code, ReasonCode::LowConfidence);
        assert!(d.message.contains("not clearly visible"));
        assert!(d.message.contains("confidence"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let d = engine().score(
            &classification(IssueClass::Garbage, 0.70),
            &gps(GpsStatus::NoGpsInPhoto, 0, None),
        );
        assert_eq!(d.final_score, 70);
        assert!(d.accepted);
        assert_eq!(d.message, "Good garbage detected with 70.0% confidence.");

        let d = engine().score(
            &classification(IssueClass::Garbage, 0.72),
            &gps(GpsStatus::MinorMismatch, -3, Some(1.8)),
        );
        assert_eq!(d.final_score, 69);
        assert!(!d.accepted);
        assert_eq!(d.reason_codes(), vec![ReasonCode::ScoreBelowThreshold]);
    }

    #[test]
    fn test_minor_mismatch_message() {
        let d = engine().score(
            &classification(IssueClass::Pothole, 0.95),
            &gps(GpsStatus::MinorMismatch, -2, Some(1.234)),
        );
        assert!(d.accepted);
        assert!(d.message.ends_with("Minor location mismatch (1.23 km)."));
    }
}
