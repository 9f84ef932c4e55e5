//! Inbound report submission

use bytes::Bytes;
use chrono::{DateTime, Utc};
use sl_common::Coordinates;
use uuid::Uuid;

/// A citizen report as handed to the pipeline
///
/// Immutable once built. The image buffer is reference counted so the
/// classifier and the EXIF reader can read it concurrently without copies.
#[derive(Debug, Clone)]
pub struct ReportSubmission {
    pub submission_id: Uuid,
    pub image: Bytes,
    /// Coordinates reported by the client device
    pub coordinates: Coordinates,
    pub description: Option<String>,
    /// Capture time reported by the client; EXIF takes precedence
    pub captured_at: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
}

impl ReportSubmission {
    pub fn new(image: impl Into<Bytes>, latitude: f64, longitude: f64) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            image: image.into(),
            coordinates: Coordinates::new(latitude, longitude),
            description: None,
            captured_at: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_submission_has_unique_id() {
        let a = ReportSubmission::new(vec![1u8, 2, 3], 31.5, 74.3);
        let b = ReportSubmission::new(vec![1u8, 2, 3], 31.5, 74.3);
        assert_ne!(a.submission_id, b.submission_id);
        assert_eq!(a.image.len(), 3);
        assert!(a.description.is_none());
    }

    #[test]
    fn test_builder_sets_optional_fields() {
        let now = Utc::now();
        let s = ReportSubmission::new(Bytes::from_static(b"x"), 24.86, 67.0)
            .with_description("pothole near the roundabout")
            .with_captured_at(now);
        assert_eq!(s.description.as_deref(), Some("pothole near the roundabout"));
        assert_eq!(s.captured_at, Some(now));
        assert_eq!(s.coordinates, Coordinates::new(24.86, 67.0));
    }
}
