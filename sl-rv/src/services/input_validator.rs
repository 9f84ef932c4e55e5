//! Layer 0 input validation
//!
//! Cheap structural and quality checks run before any classifier or
//! geocoding cost. Every check runs regardless of earlier failures so the
//! reporter gets the complete list in one response. Checks that need
//! decoded pixels are skipped when the file cannot be decoded.
//!
//! Dimension limits, aspect ratio and blank content only warn. They lower
//! the quality score but never reject on their own.
//!
//! Validation is a pure function of the submission and the supplied clock,
//! so validating the same submission twice yields the same outcome.

use chrono::{DateTime, TimeZone, Utc};
use image::{DynamicImage, ImageReader};
use sl_common::{Coordinates, RegionBounds};
use std::io::Cursor;
use tracing::{debug, info, warn};

use crate::config::ValidationSettings;
use crate::models::{
    CheckKind, CheckRecord, PhotoMetadata, ReasonCode, ReportSubmission, ValidationOutcome,
};
use crate::services::exif_reader::ExifGpsReader;
use crate::services::image_metrics::ImageStats;

/// Phone screen ratios: 16:9, 9:16, 18:9, 19:9
const SCREENSHOT_RATIOS: [f64; 4] = [16.0 / 9.0, 9.0 / 16.0, 18.0 / 9.0, 19.0 / 9.0];
const SCREENSHOT_RATIO_TOLERANCE: f64 = 0.05;

/// Common camera ratios: 1:1, 4:3, 3:2, 3:4, 2:3
const IDEAL_RATIOS: [f64; 5] = [1.0, 1.33, 1.5, 0.75, 0.67];

pub struct InputValidator {
    settings: ValidationSettings,
    region: RegionBounds,
    exif_reader: ExifGpsReader,
}

impl InputValidator {
    pub fn new(settings: ValidationSettings, region: RegionBounds) -> Self {
        info!(
            min_blur = settings.min_blur_score,
            min_brightness = settings.min_brightness,
            max_brightness = settings.max_brightness,
            min_resolution = %format!("{}x{}", settings.min_width, settings.min_height),
            "Layer 0 validator initialized"
        );
        Self {
            settings,
            region,
            exif_reader: ExifGpsReader::new(),
        }
    }

    pub fn settings(&self) -> &ValidationSettings {
        &self.settings
    }

    pub fn region(&self) -> &RegionBounds {
        &self.region
    }

    /// Validate against the current time
    pub fn validate(&self, submission: &ReportSubmission) -> ValidationOutcome {
        self.validate_at(submission, Utc::now())
    }

    /// Validate with an explicit "now" for the recency check
    pub fn validate_at(&self, submission: &ReportSubmission, now: DateTime<Utc>) -> ValidationOutcome {
        let bytes = submission.image.as_ref();
        let metadata = self.exif_reader.read_lenient(bytes);
        let mut checks = Vec::with_capacity(11);
        let mut warnings = Vec::new();

        checks.push(self.check_file_size(bytes.len()));

        let mut screenshot = None;
        match probe_dimensions(bytes) {
            Err(e) => checks.push(CheckRecord::fail(
                CheckKind::FileValidity,
                ReasonCode::InvalidFile,
                0.0,
                format!("Invalid or corrupted image file: {}", e),
            )),
            Ok((width, height)) => {
                let dimension_check = self.check_dimension_limits(width, height);

                // Never decode past the dimension ceiling, even though it only warns
                let decoded = dimension_check
                    .passed
                    .then(|| image::load_from_memory(bytes));

                checks.push(match &decoded {
                    Some(Err(e)) => CheckRecord::fail(
                        CheckKind::FileValidity,
                        ReasonCode::InvalidFile,
                        0.0,
                        format!("Invalid or corrupted image file: {}", e),
                    ),
                    _ => CheckRecord::pass(CheckKind::FileValidity, 100.0, "Valid image file"),
                });
                checks.push(dimension_check);
                checks.push(self.check_aspect_ratio(width, height));
                checks.push(self.check_resolution(width, height));

                if let Some(Ok(image)) = &decoded {
                    checks.extend(self.check_pixels(image));
                }
                screenshot = Some(self.check_screenshot(width, height, &metadata));
            }
        }

        checks.push(self.check_timestamp(submission, &metadata, now, &mut warnings));
        if let Some(screenshot) = screenshot {
            if screenshot.score < 100.0 {
                warnings.push(screenshot.message.clone());
            }
            checks.push(screenshot);
        }
        checks.push(self.check_gps_region(&submission.coordinates));

        self.finish(submission, checks, warnings)
    }

    fn finish(
        &self,
        submission: &ReportSubmission,
        checks: Vec<CheckRecord>,
        warnings: Vec<String>,
    ) -> ValidationOutcome {
        let outcome = ValidationOutcome::from_checks(checks, warnings);
        if outcome.passed {
            info!(
                submission_id = %submission.submission_id,
                quality = outcome.overall_quality,
                warnings = outcome.warnings.len(),
                "Layer 0 validation passed"
            );
        } else {
            warn!(
                submission_id = %submission.submission_id,
                errors = ?outcome.error_codes(),
                quality = outcome.overall_quality,
                "Layer 0 validation failed"
            );
        }
        outcome
    }

    fn check_file_size(&self, len: usize) -> CheckRecord {
        let kb = len as f64 / 1024.0;
        let mb = kb / 1024.0;

        if len < self.settings.min_file_size_bytes {
            return CheckRecord::fail(
                CheckKind::FileSize,
                ReasonCode::InvalidFile,
                0.0,
                format!(
                    "File too small ({:.2} KB). Minimum {:.0} KB required. Possible corruption.",
                    kb,
                    self.settings.min_file_size_bytes as f64 / 1024.0
                ),
            );
        }
        if len > self.settings.max_file_size_bytes {
            return CheckRecord::fail(
                CheckKind::FileSize,
                ReasonCode::InvalidFile,
                0.0,
                format!(
                    "File too large ({:.2} MB). Maximum {:.0} MB allowed.",
                    mb,
                    self.settings.max_file_size_bytes as f64 / (1024.0 * 1024.0)
                ),
            );
        }

        // Full marks up to 5 MB, tapering towards the ceiling
        let score = if mb <= 5.0 {
            100.0
        } else {
            (100.0 - ((mb - 5.0) / 5.0) * 20.0).max(50.0)
        };
        CheckRecord::pass(
            CheckKind::FileSize,
            round2(score),
            format!("Acceptable file size ({:.2} MB)", mb),
        )
    }

    fn check_dimension_limits(&self, width: u32, height: u32) -> CheckRecord {
        let s = &self.settings;
        if width > s.max_width || height > s.max_height {
            return CheckRecord::warn(
                CheckKind::DimensionLimits,
                0.0,
                format!(
                    "Image dimensions ({}x{}) exceed maximum allowed ({}x{}). Potential decompression bomb.",
                    width, height, s.max_width, s.max_height
                ),
            );
        }
        CheckRecord::pass(
            CheckKind::DimensionLimits,
            100.0,
            format!("Safe image dimensions ({}x{})", width, height),
        )
    }

    fn check_aspect_ratio(&self, width: u32, height: u32) -> CheckRecord {
        let ratio = if height > 0 {
            width as f64 / height as f64
        } else {
            0.0
        };

        if ratio < self.settings.min_aspect_ratio || ratio > self.settings.max_aspect_ratio {
            return CheckRecord::warn(
                CheckKind::AspectRatio,
                0.0,
                format!(
                    "Aspect ratio ({:.2}) too distorted. Acceptable range: {} - {}.",
                    ratio, self.settings.min_aspect_ratio, self.settings.max_aspect_ratio
                ),
            );
        }

        let min_diff = IDEAL_RATIOS
            .iter()
            .map(|ideal| (ratio - ideal).abs())
            .fold(f64::INFINITY, f64::min);
        CheckRecord::pass(
            CheckKind::AspectRatio,
            round2((100.0 - min_diff * 30.0).max(70.0)),
            format!("Acceptable aspect ratio ({:.2})", ratio),
        )
    }

    fn check_resolution(&self, width: u32, height: u32) -> CheckRecord {
        let s = &self.settings;
        let width_ratio = width as f64 / s.min_width.max(1) as f64;
        let height_ratio = height as f64 / s.min_height.max(1) as f64;
        let score = round2((width_ratio.min(height_ratio) * 100.0).min(100.0));

        if width >= s.min_width && height >= s.min_height {
            CheckRecord::pass(
                CheckKind::Resolution,
                score,
                format!("Good resolution ({}x{})", width, height),
            )
        } else {
            CheckRecord::fail(
                CheckKind::Resolution,
                ReasonCode::LowResolution,
                score,
                format!(
                    "Resolution too low ({}x{}). Minimum {}x{} required.",
                    width, height, s.min_width, s.min_height
                ),
            )
        }
    }

    /// Blur, brightness and blank-content checks on decoded pixels
    fn check_pixels(&self, image: &DynamicImage) -> [CheckRecord; 3] {
        let stats = ImageStats::measure(&image.to_luma8());
        debug!(
            mean = stats.mean,
            std_dev = stats.std_dev,
            laplacian_variance = stats.laplacian_variance,
            "Measured image statistics"
        );
        self.check_stats(&stats)
    }

    fn check_stats(&self, stats: &ImageStats) -> [CheckRecord; 3] {
        let s = &self.settings;
        let blur_score =
            round2((stats.laplacian_variance / s.min_blur_score.max(1.0) * 100.0).min(100.0));
        let blur = if stats.laplacian_variance >= s.min_blur_score {
            CheckRecord::pass(
                CheckKind::Blur,
                blur_score,
                format!("Image is sharp (score: {:.2})", stats.laplacian_variance),
            )
        } else {
            CheckRecord::fail(
                CheckKind::Blur,
                ReasonCode::TooBlurry,
                blur_score,
                format!(
                    "Image too blurry (score: {:.2}). Please retake in better focus.",
                    stats.laplacian_variance
                ),
            )
        };

        let brightness_score = round2(stats.mean / 255.0 * 100.0);
        let brightness = if stats.mean < s.min_brightness {
            CheckRecord::fail(
                CheckKind::Brightness,
                ReasonCode::TooDark,
                brightness_score,
                format!(
                    "Image too dark (level: {:.2}). Please adjust lighting.",
                    stats.mean
                ),
            )
        } else if stats.mean > s.max_brightness {
            CheckRecord::fail(
                CheckKind::Brightness,
                ReasonCode::TooBright,
                brightness_score,
                format!(
                    "Image too bright (level: {:.2}). Please adjust lighting.",
                    stats.mean
                ),
            )
        } else {
            CheckRecord::pass(
                CheckKind::Brightness,
                brightness_score,
                format!("Good brightness (level: {:.2})", stats.mean),
            )
        };

        let content = if stats.std_dev < s.min_content_std_dev {
            CheckRecord::warn(
                CheckKind::Content,
                0.0,
                format!(
                    "Image appears blank or has no content (variation: {:.2}). Please submit a photo with visible content.",
                    stats.std_dev
                ),
            )
        } else {
            CheckRecord::pass(
                CheckKind::Content,
                round2((stats.std_dev / 50.0 * 100.0).min(100.0)),
                format!("Image has valid content (variation: {:.2})", stats.std_dev),
            )
        };

        [blur, brightness, content]
    }

    /// EXIF capture time wins over the client-reported one
    fn check_timestamp(
        &self,
        submission: &ReportSubmission,
        metadata: &PhotoMetadata,
        now: DateTime<Utc>,
        warnings: &mut Vec<String>,
    ) -> CheckRecord {
        let captured_at = metadata
            .captured_at
            .map(|naive| Utc.from_utc_datetime(&naive))
            .or(submission.captured_at);

        let Some(captured_at) = captured_at else {
            let message = "No capture timestamp found (accepted with warning)".to_string();
            warnings.push(message.clone());
            return CheckRecord::pass(CheckKind::Timestamp, 50.0, message);
        };

        let age_days = now.signed_duration_since(captured_at).num_days();
        let max_age = self.settings.max_photo_age_days;

        if age_days < 0 {
            let message =
                "Photo capture time is in the future (accepted with warning)".to_string();
            warnings.push(message.clone());
            return CheckRecord::pass(CheckKind::Timestamp, 50.0, message);
        }

        let score = round2((100.0 - (age_days as f64 / max_age.max(1) as f64) * 100.0).max(0.0));
        if age_days > max_age {
            CheckRecord::fail(
                CheckKind::Timestamp,
                ReasonCode::PhotoTooOld,
                score,
                format!(
                    "Photo is {} days old. Please take a fresh photo (max {} days).",
                    age_days, max_age
                ),
            )
        } else {
            CheckRecord::pass(
                CheckKind::Timestamp,
                score,
                format!("Photo is {} days old (within acceptable range)", age_days),
            )
        }
    }

    /// Warning only, never rejects
    fn check_screenshot(&self, width: u32, height: u32, metadata: &PhotoMetadata) -> CheckRecord {
        let ratio = if height > 0 {
            width as f64 / height as f64
        } else {
            0.0
        };
        let screen_ratio = SCREENSHOT_RATIOS
            .iter()
            .any(|r| (ratio - r).abs() < SCREENSHOT_RATIO_TOLERANCE);
        let minimal_exif = metadata.field_count < self.settings.screenshot_exif_fields;

        if screen_ratio && minimal_exif {
            CheckRecord::pass(
                CheckKind::Screenshot,
                60.0,
                format!(
                    "Warning: Image appears to be a screenshot (aspect ratio {:.2}, no camera EXIF). Please submit original photos.",
                    ratio
                ),
            )
        } else {
            CheckRecord::pass(
                CheckKind::Screenshot,
                100.0,
                "Image appears to be an original photo",
            )
        }
    }

    fn check_gps_region(&self, point: &Coordinates) -> CheckRecord {
        if !point.is_valid() {
            return CheckRecord::fail(
                CheckKind::GpsRegion,
                ReasonCode::GpsOutOfRegion,
                0.0,
                format!("Invalid GPS coordinates {}", point),
            );
        }
        if self.region.contains(point) {
            CheckRecord::pass(
                CheckKind::GpsRegion,
                100.0,
                format!("Valid location {}", point),
            )
        } else {
            CheckRecord::fail(
                CheckKind::GpsRegion,
                ReasonCode::GpsOutOfRegion,
                0.0,
                format!("GPS location {} outside service region bounds", point),
            )
        }
    }
}

/// Width and height from the image header without decoding pixels
fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), String> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
