//! Issue classifier adapter
//!
//! The trained model is an opaque [`ClassificationModel`]. [`IssueClassifier`]
//! bounds each prediction with a timeout, checks the answer, and adds the
//! deterministic severity estimate. Any model failure is fatal to the
//! submission; the pipeline never approves a report it could not classify.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ClassifierSettings;
use crate::models::{ClassificationResult, IssueClass, ModelPrediction, Severity};
use crate::services::severity::estimate_severity;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error("Classifier task failed: {0}")]
    TaskFailed(String),
}

/// Opaque image classification model
#[async_trait]
pub trait ClassificationModel: Send + Sync {
    /// Model identifier for logs
    fn name(&self) -> &str;

    async fn predict(&self, image: Bytes) -> Result<ModelPrediction, ClassifierError>;
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    predicted_class: String,
    confidence: f64,
}

/// Model served over HTTP
///
/// POSTs the raw image bytes and expects
/// `{"predicted_class": "pothole", "confidence": 0.93}`.
pub struct HttpModelClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpModelClient {
    pub fn new(settings: &ClassifierSettings) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ClassificationModel for HttpModelClient {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn predict(&self, image: Bytes) -> Result<ModelPrediction, ClassifierError> {
        debug!(endpoint = %self.endpoint, bytes = image.len(), "Requesting prediction");

        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Unavailable(format!(
                "model server returned {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: ModelResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        Ok(ModelPrediction {
            predicted_class: IssueClass::from_label(&body.predicted_class),
            confidence: body.confidence,
        })
    }
}

/// Classification with timeout and severity
pub struct IssueClassifier {
    model: Arc<dyn ClassificationModel>,
    timeout: Duration,
}

impl IssueClassifier {
    pub fn new(model: Arc<dyn ClassificationModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn classify(&self, image: Bytes) -> Result<ClassificationResult, ClassifierError> {
        let prediction = match tokio::time::timeout(self.timeout, self.model.predict(image.clone())).await {
            Ok(Ok(prediction)) => prediction,
            Ok(Err(e)) => {
                error!(model = self.model.name(), error = %e, "Classifier failed");
                return Err(e);
            }
            Err(_) => {
                error!(model = self.model.name(), timeout = ?self.timeout, "Classifier timed out");
                return Err(ClassifierError::Timeout(self.timeout));
            }
        };

        let confidence = prediction.confidence;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ClassifierError::InvalidResponse(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }

        let class = prediction.predicted_class;
        let severity = if class.is_civic_issue() {
            tokio::task::spawn_blocking(move || severity_for(&image, class))
                .await
                .map_err(|e| ClassifierError::TaskFailed(e.to_string()))?
        } else {
            None
        };

        info!(
            class = %class,
            confidence,
            severity = severity.map(|s| s.as_str()).unwrap_or("n/a"),
            "Classified image"
        );

        Ok(ClassificationResult {
            predicted_class: class,
            confidence,
            severity,
        })
    }
}

fn severity_for(image: &[u8], class: IssueClass) -> Option<Severity> {
    match image::load_from_memory(image) {
        Ok(decoded) => estimate_severity(&decoded, class),
        Err(e) => {
            warn!(error = %e, "Could not decode image for severity, assuming medium");
            Some(Severity::Medium)
        }
    }
}
