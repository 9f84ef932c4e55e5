//! Wire format returned to reporting clients

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::{IssueClass, Severity};
use super::decision::PipelineReport;
use super::gps::{GpsStatus, GpsVerificationResult, Landmark};
use super::reason::ReasonCode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsVerificationSummary {
    pub has_photo_gps: bool,
    pub distance_km: Option<f64>,
    pub is_spoofed: bool,
    pub score_adjustment: i32,
    pub verification_status: GpsStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nearby_landmarks: Vec<Landmark>,
    pub penalty_reason: String,
}

impl From<&GpsVerificationResult> for GpsVerificationSummary {
    fn from(gps: &GpsVerificationResult) -> Self {
        Self {
            has_photo_gps: gps.has_photo_gps,
            distance_km: gps.distance_km,
            is_spoofed: gps.is_spoofed,
            score_adjustment: gps.score_adjustment,
            verification_status: gps.status,
            photo_address: gps.photo_address.clone(),
            submitted_address: gps.submitted_address.clone(),
            nearby_landmarks: gps.nearby_landmarks.clone(),
            penalty_reason: gps.penalty_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub success: bool,
    pub submission_id: Uuid,
    pub predicted_class: IssueClass,
    /// Percentage, two decimals
    pub confidence: f64,
    pub severity: Option<Severity>,
    pub gps_verification: GpsVerificationSummary,
    pub final_score: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedResponse {
    pub success: bool,
    pub submission_id: Uuid,
    /// Human-readable reasons
    pub errors: Vec<String>,
    /// Stable codes, one per entry in `errors`
    pub error_codes: Vec<ReasonCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Present when the submission got as far as scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_class: Option<IssueClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_verification: Option<GpsVerificationSummary>,
}

/// Response body of `POST /reports/validate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportResponse {
    Accepted(AcceptedResponse),
    Rejected(RejectedResponse),
}

impl ReportResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ReportResponse::Accepted(_))
    }
}

impl From<&PipelineReport> for ReportResponse {
    fn from(report: &PipelineReport) -> Self {
        let decision = &report.decision;
        let warnings = report.warnings();

        if decision.accepted {
            if let (Some(classification), Some(gps)) =
                (&report.classification, &report.gps_verification)
            {
                return ReportResponse::Accepted(AcceptedResponse {
                    success: true,
                    submission_id: report.submission_id,
                    predicted_class: classification.predicted_class,
                    confidence: classification.confidence_percent(),
                    severity: classification.severity,
                    gps_verification: gps.into(),
                    final_score: decision.final_score,
                    message: decision.message.clone(),
                    warnings,
                });
            }
        }

        let scored = report.classification.is_some() && report.gps_verification.is_some();
        ReportResponse::Rejected(RejectedResponse {
            success: false,
            submission_id: report.submission_id,
            errors: decision.reasons.iter().map(|r| r.message.clone()).collect(),
            error_codes: decision.reason_codes(),
            warnings,
            final_score: scored.then_some(decision.final_score),
            predicted_class: report.classification.as_ref().map(|c| c.predicted_class),
            confidence: report
                .classification
                .as_ref()
                .map(|c| c.confidence_percent()),
            gps_verification: report.gps_verification.as_ref().map(Into::into),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classification::ClassificationResult;
    use crate::models::decision::{FinalDecision, PipelineRun};
    use sl_common::events::PipelineState;
    use sl_common::Coordinates;
    use std::time::Duration;

    #[test]
    fn test_timeout_renders_as_rejection_without_score() {
        let mut run = PipelineRun::new(Uuid::new_v4());
        run.transition_to(PipelineState::Validating);
        run.transition_to(PipelineState::Rejected);
        let report = run.finish(FinalDecision::timed_out(Duration::from_secs(30)));

        let response = ReportResponse::from(&report);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_codes"][0], "PROCESSING_TIMEOUT");
        assert!(json.get("final_score").is_none());
        assert!(json.get("gps_verification").is_none());
    }

    #[test]
    fn test_accepted_shape() {
        let mut run = PipelineRun::new(Uuid::new_v4());
        run.classification = Some(ClassificationResult {
            predicted_class: IssueClass::Pothole,
            confidence: 0.925,
            severity: Some(Severity::Large),
        });
        run.gps_verification = Some(GpsVerificationResult::no_photo_gps(Coordinates::new(
            31.5, 74.3,
        )));
        let report = run.finish(FinalDecision {
            final_score: 93,
            accepted: true,
            reasons: vec![],
            message: "Clear pothole detected with 92.5% confidence.".into(),
        });

        let response = ReportResponse::from(&report);
        assert!(response.is_success());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["predicted_class"], "pothole");
        assert_eq!(json["confidence"], 92.5);
        assert_eq!(json["severity"], "large");
        assert_eq!(json["final_score"], 93);
        assert_eq!(json["gps_verification"]["verification_status"], "no_gps_in_photo");
        assert_eq!(json["gps_verification"]["score_adjustment"], 0);
        assert!(json["gps_verification"]["distance_km"].is_null());
    }
}
