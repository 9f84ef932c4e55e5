//! Report submission handler
//!
//! POST /reports/validate

use axum::{extract::State, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    models::{ReportResponse, ReportSubmission},
    AppState,
};

/// POST /reports/validate request
#[derive(Debug, Deserialize)]
pub struct ValidateReportRequest {
    /// Image file, base64 encoded; a `data:image/...;base64,` prefix is allowed
    pub image_base64: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: Option<String>,
    /// Client-side capture time; EXIF capture time takes precedence
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

impl ValidateReportRequest {
    fn into_submission(self) -> ApiResult<ReportSubmission> {
        let encoded = match self.image_base64.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => self.image_base64.as_str(),
        };
        let image = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ApiError::BadRequest(format!("image_base64 is not valid base64: {}", e)))?;

        let mut submission = ReportSubmission::new(image, self.latitude, self.longitude);
        if let Some(description) = self.description {
            submission = submission.with_description(description);
        }
        if let Some(captured_at) = self.captured_at {
            submission = submission.with_captured_at(captured_at);
        }
        Ok(submission)
    }
}

/// POST /reports/validate
///
/// Runs the full pipeline and returns the acceptance or rejection body with
/// 200. Returns 503 when the submission cannot be processed right now.
pub async fn validate_report(
    State(state): State<AppState>,
    Json(request): Json<ValidateReportRequest>,
) -> ApiResult<Json<ReportResponse>> {
    let submission = request.into_submission()?;
    let submission_id = submission.submission_id;

    match state.orchestrator.submit(submission).await {
        Ok(report) => {
            let response = ReportResponse::from(&report);
            info!(
                submission_id = %submission_id,
                success = response.is_success(),
                state = %report.state,
                "Report validated"
            );
            Ok(Json(response))
        }
        Err(e) => {
            warn!(submission_id = %submission_id, error = %e, "Report unprocessable");
            *state.last_error.write().await = Some(format!("{}: {}", submission_id, e));
            Err(ApiError::from(e))
        }
    }
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new().route("/reports/validate", post(validate_report))
}
