//! sl-rv bootstrap configuration
//!
//! One TOML file, every section optional:
//!
//! ```toml
//! bind_address = "0.0.0.0"
//! port = 5780
//!
//! [logging]
//! level = "sl_rv=debug,info"
//!
//! [region]
//! lat_min = 23.0
//! lat_max = 37.0
//! lon_min = 60.0
//! lon_max = 78.0
//!
//! [geocoder]
//! requests_per_second = 1
//! timeout_secs = 5
//!
//! [classifier]
//! endpoint = "http://127.0.0.1:8500/predict"
//! ```

use serde::{Deserialize, Serialize};
use sl_common::config::LoggingConfig;
use sl_common::{Error, RegionBounds, Result};
use std::time::Duration;

/// Config file name looked up under the platform config directory
pub const CONFIG_FILE_NAME: &str = "sl-rv.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SL_RV_CONFIG";

pub const DEFAULT_PORT: u16 = 5780;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub logging: LoggingConfig,
    pub region: RegionBounds,
    pub validation: ValidationSettings,
    pub gps: GpsSettings,
    pub scoring: ScoringSettings,
    pub pipeline: PipelineSettings,
    pub geocoder: GeocoderSettings,
    pub classifier: ClassifierSettings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            logging: LoggingConfig::default(),
            region: RegionBounds::default(),
            validation: ValidationSettings::default(),
            gps: GpsSettings::default(),
            scoring: ScoringSettings::default(),
            pipeline: PipelineSettings::default(),
            geocoder: GeocoderSettings::default(),
            classifier: ClassifierSettings::default(),
        }
    }
}

impl ServiceConfig {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let v = &self.validation;
        if v.min_file_size_bytes > v.max_file_size_bytes {
            return Err(Error::Config(
                "validation.min_file_size_bytes exceeds max_file_size_bytes".into(),
            ));
        }
        if v.min_brightness > v.max_brightness {
            return Err(Error::Config(
                "validation.min_brightness exceeds max_brightness".into(),
            ));
        }
        if v.min_aspect_ratio > v.max_aspect_ratio {
            return Err(Error::Config(
                "validation.min_aspect_ratio exceeds max_aspect_ratio".into(),
            ));
        }
        if self.region.lat_min > self.region.lat_max || self.region.lon_min > self.region.lon_max {
            return Err(Error::Config("region bounds are inverted".into()));
        }
        if self.gps.verified_threshold_km > self.gps.spoofing_threshold_km {
            return Err(Error::Config(
                "gps.verified_threshold_km exceeds spoofing_threshold_km".into(),
            ));
        }
        if self.scoring.accept_threshold > 100 {
            return Err(Error::Config("scoring.accept_threshold must be 0-100".into()));
        }
        if self.geocoder.requests_per_second == 0 || self.geocoder.burst == 0 {
            return Err(Error::Config(
                "geocoder.requests_per_second and burst must be at least 1".into(),
            ));
        }
        if self.pipeline.deadline_secs == 0 {
            return Err(Error::Config("pipeline.deadline_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Layer 0 thresholds. Boundaries are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub min_file_size_bytes: usize,
    pub max_file_size_bytes: usize,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    /// Laplacian variance
    pub min_blur_score: f64,
    pub min_brightness: f64,
    pub max_brightness: f64,
    /// Grayscale standard deviation below which the image is blank
    pub min_content_std_dev: f64,
    pub max_photo_age_days: i64,
    /// Fewer EXIF fields than this marks a screenshot candidate
    pub screenshot_exif_fields: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_file_size_bytes: 10 * 1024,
            max_file_size_bytes: 10 * 1024 * 1024,
            min_width: 300,
            min_height: 300,
            max_width: 10_000,
            max_height: 10_000,
            min_aspect_ratio: 0.5,
            max_aspect_ratio: 2.0,
            min_blur_score: 50.0,
            min_brightness: 30.0,
            max_brightness: 230.0,
            min_content_std_dev: 5.0,
            max_photo_age_days: 30,
            screenshot_exif_fields: 5,
        }
    }
}

/// GPS cross-verification cutoffs and adjustments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsSettings {
    /// Strictly greater distance counts as spoofing
    pub spoofing_threshold_km: f64,
    /// Strictly smaller distance is a close match
    pub verified_threshold_km: f64,
    pub spoofing_penalty: i32,
    pub verified_bonus: i32,
    /// Adjustment at the far edge of the minor-mismatch band
    pub max_mismatch_penalty: i32,
    pub min_landmarks_for_verified: usize,
    /// Submitted point is only geocoded separately beyond this distance
    pub separate_address_km: f64,
}

impl Default for GpsSettings {
    fn default() -> Self {
        Self {
            spoofing_threshold_km: 5.0,
            verified_threshold_km: 0.5,
            spoofing_penalty: -50,
            verified_bonus: 10,
            max_mismatch_penalty: -10,
            min_landmarks_for_verified: 1,
            separate_address_km: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub accept_threshold: u8,
    /// Below this the issue is "not clearly visible"
    pub min_confidence: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            accept_threshold: 70,
            min_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Whole-submission deadline
    pub deadline_secs: u64,
    /// EventBus capacity
    pub event_capacity: usize,
    /// Largest accepted request body (base64 image included)
    pub max_request_bytes: usize,
}

impl PipelineSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            deadline_secs: 60,
            event_capacity: 100,
            max_request_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    /// Nominatim-compatible reverse geocoding endpoint
    pub reverse_url: String,
    /// Overpass-compatible interpreter endpoint
    pub landmark_url: String,
    pub user_agent: String,
    pub requests_per_second: u32,
    pub burst: u32,
    /// Per lookup, including the wait for a rate-limit slot
    pub timeout_secs: u64,
    pub search_radius_m: u32,
    pub max_landmarks: usize,
}

impl GeocoderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            reverse_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            landmark_url: "https://overpass-api.de/api/interpreter".to_string(),
            user_agent: "StreetLight-Pakistan-Civic-Reporting/1.0".to_string(),
            requests_per_second: 1,
            burst: 1,
            timeout_secs: 5,
            search_radius_m: 500,
            max_landmarks: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Model server accepting raw image bytes
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl ClassifierSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8500/predict".to_string(),
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.validation.min_width, 300);
        assert_eq!(config.validation.min_file_size_bytes, 10_240);
        assert_eq!(config.validation.max_file_size_bytes, 10_485_760);
        assert_eq!(config.gps.spoofing_penalty, -50);
        assert_eq!(config.gps.verified_bonus, 10);
        assert_eq!(config.scoring.accept_threshold, 70);
        assert_eq!(config.geocoder.search_radius_m, 500);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            port = 9000

            [gps]
            spoofing_threshold_km = 3.0

            [geocoder]
            requests_per_second = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.gps.spoofing_threshold_km, 3.0);
        assert_eq!(config.gps.verified_threshold_km, 0.5);
        assert_eq!(config.geocoder.requests_per_second, 2);
        assert_eq!(config.geocoder.burst, 1);
        assert_eq!(config.region, RegionBounds::default());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let mut config = ServiceConfig::default();
        config.geocoder.requests_per_second = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = ServiceConfig::default();
        config.validation.min_brightness = 240.0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.gps.verified_threshold_km = 10.0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.region.lat_min = 40.0;
        assert!(config.validate().is_err());
    }
}
