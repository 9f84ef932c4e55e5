//! Classifier output types

use serde::{Deserialize, Serialize};

/// Predicted report category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueClass {
    Pothole,
    Garbage,
    Other,
}

impl IssueClass {
    /// Parse a model label. Anything that is not a known civic issue maps
    /// to `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pothole" | "potholes" => IssueClass::Pothole,
            "garbage" | "trash" | "litter" => IssueClass::Garbage,
            _ => IssueClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueClass::Pothole => "pothole",
            IssueClass::Garbage => "garbage",
            IssueClass::Other => "other",
        }
    }

    pub fn is_civic_issue(&self) -> bool {
        !matches!(self, IssueClass::Other)
    }
}

impl std::fmt::Display for IssueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Small,
    Medium,
    Large,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Small => "small",
            Severity::Medium => "medium",
            Severity::Large => "large",
        }
    }
}

/// Raw answer from the opaque model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub predicted_class: IssueClass,
    /// Probability in [0, 1]
    pub confidence: f64,
}

/// Model prediction plus the deterministic severity estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub predicted_class: IssueClass,
    pub confidence: f64,
    /// Only estimated for civic issues
    pub severity: Option<Severity>,
}

impl ClassificationResult {
    /// Below this confidence the issue counts as not clearly visible
    pub const CLEARLY_VISIBLE_CONFIDENCE: f64 = 0.5;

    pub fn is_clearly_visible(&self) -> bool {
        self.predicted_class.is_civic_issue()
            && self.confidence >= Self::CLEARLY_VISIBLE_CONFIDENCE
    }

    /// Confidence as a percentage rounded to two decimals
    pub fn confidence_percent(&self) -> f64 {
        (self.confidence * 10_000.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing() {
        assert_eq!(IssueClass::from_label("pothole"), IssueClass::Pothole);
        assert_eq!(IssueClass::from_label(" Garbage "), IssueClass::Garbage);
        assert_eq!(IssueClass::from_label("cat"), IssueClass::Other);
        assert_eq!(IssueClass::from_label(""), IssueClass::Other);
    }

    #[test]
    fn test_class_wire_format() {
        assert_eq!(serde_json::to_string(&IssueClass::Pothole).unwrap(), "\"pothole\"");
        assert_eq!(serde_json::to_string(&Severity::Large).unwrap(), "\"large\"");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Large > Severity::Medium);
        assert!(Severity::Medium > Severity::Small);
        assert_eq!(Severity::Small.max(Severity::Large), Severity::Large);
    }

    #[test]
    fn test_clearly_visible() {
        let mut result = ClassificationResult {
            predicted_class: IssueClass::Pothole,
            confidence: 0.5,
            severity: Some(Severity::Small),
        };
        assert!(result.is_clearly_visible());

        result.confidence = 0.49;
        assert!(!result.is_clearly_visible());

        result.confidence = 0.99;
        result.predicted_class = IssueClass::Other;
        assert!(!result.is_clearly_visible());
    }

    #[test]
    fn test_confidence_percent() {
        let result = ClassificationResult {
            predicted_class: IssueClass::Garbage,
            confidence: 0.92456,
            severity: None,
        };
        assert!((result.confidence_percent() - 92.46).abs() < 1e-9);
    }
}
