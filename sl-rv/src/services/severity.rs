//! Deterministic severity estimate
//!
//! Two independent estimates on a 224x224 grayscale copy of the photo,
//! combined by taking the more severe:
//!
//! - **Size**: largest connected dark region (potholes: intensity <= 80;
//!   garbage: at or below the Otsu threshold) by area and bounding box.
//! - **Features**: potholes score dark-pixel ratio and edge density,
//!   garbage scores Laplacian texture and Otsu coverage.

use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::models::{IssueClass, Severity};
use crate::services::image_metrics::{
    analysis_gray, connected_components, dark_ratio, edge_density, laplacian_variance,
    otsu_threshold,
};

const POTHOLE_DARK_THRESHOLD: u8 = 80;
const EDGE_LOW: f64 = 50.0;
const EDGE_HIGH: f64 = 150.0;

/// Severity for a civic issue; `None` for `Other`
pub fn estimate_severity(image: &DynamicImage, class: IssueClass) -> Option<Severity> {
    if !class.is_civic_issue() {
        return None;
    }
    let gray = analysis_gray(image);
    Some(estimate_from_gray(&gray, class))
}

/// Combined estimate on an already prepared grayscale image
pub fn estimate_from_gray(gray: &GrayImage, class: IssueClass) -> Severity {
    let by_size = size_based(gray, class);
    let by_features = feature_based(gray, class);
    let severity = by_size.max(by_features);
    debug!(
        class = %class,
        size = by_size.as_str(),
        features = by_features.as_str(),
        severity = severity.as_str(),
        "Estimated severity"
    );
    severity
}

fn size_based(gray: &GrayImage, class: IssueClass) -> Severity {
    let threshold = match class {
        IssueClass::Pothole => POTHOLE_DARK_THRESHOLD,
        _ => otsu_threshold(gray),
    };
    let mask: Vec<bool> = gray.pixels().map(|p| p.0[0] <= threshold).collect();
    let components = connected_components(&mask, gray.width(), gray.height());

    let Some(largest) = components.iter().max_by_key(|c| c.area) else {
        return Severity::Small;
    };

    let image_area = (gray.width() * gray.height()).max(1) as f64;
    let coverage = largest.area as f64 / image_area;
    let bbox_coverage = (largest.width * largest.height) as f64 / image_area;
    let avg_coverage = (coverage + bbox_coverage) / 2.0;
    let (w, h) = (largest.width, largest.height);

    match class {
        IssueClass::Pothole => {
            if avg_coverage > 0.25 || w > 150 || h > 150 {
                Severity::Large
            } else if avg_coverage > 0.12 || w > 80 || h > 80 {
                Severity::Medium
            } else {
                Severity::Small
            }
        }
        _ => {
            if avg_coverage > 0.30 || bbox_coverage > 0.40 {
                Severity::Large
            } else if avg_coverage > 0.15 || bbox_coverage > 0.20 {
                Severity::Medium
            } else {
                Severity::Small
            }
        }
    }
}

fn feature_based(gray: &GrayImage, class: IssueClass) -> Severity {
    match class {
        IssueClass::Pothole => {
            let dark = dark_ratio(gray, POTHOLE_DARK_THRESHOLD);
            let edges = edge_density(gray, EDGE_LOW, EDGE_HIGH);
            let score = (dark * 0.6 + edges * 0.4) * 100.0;
            if score > 15.0 {
                Severity::Large
            } else if score > 7.0 {
                Severity::Medium
            } else {
                Severity::Small
            }
        }
        IssueClass::Garbage => {
            let texture = laplacian_variance(gray);
            let t = otsu_threshold(gray);
            let total = gray.pixels().len().max(1) as f64;
            let coverage = gray.pixels().filter(|p| p.0[0] <= t).count() as f64 / total;
            let score = (texture / 100.0 * 0.5 + coverage * 0.5) * 100.0;
            if score > 20.0 {
                Severity::Large
            } else if score > 10.0 {
                Severity::Medium
            } else {
                Severity::Small
            }
        }
        IssueClass::Other => Severity::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn with_dark_disc(radius: f64) -> GrayImage {
        GrayImage::from_fn(224, 224, |x, y| {
            let dx = x as f64 - 112.0;
            let dy = y as f64 - 112.0;
            if (dx * dx + dy * dy).sqrt() <= radius {
                Luma([30])
            } else {
                Luma([170])
            }
        })
    }

    #[test]
    fn test_other_has_no_severity() {
        let img = DynamicImage::ImageLuma8(with_dark_disc(50.0));
        assert_eq!(estimate_severity(&img, IssueClass::Other), None);
    }

    #[test]
    fn test_pothole_size_grows_with_dark_region() {
        assert_eq!(size_based(&with_dark_disc(5.0), IssueClass::Pothole), Severity::Small);
        // 91px across: wider than 80 but under 150
        assert_eq!(size_based(&with_dark_disc(45.0), IssueClass::Pothole), Severity::Medium);
        assert_eq!(size_based(&with_dark_disc(90.0), IssueClass::Pothole), Severity::Large);
    }

    #[test]
    fn test_pothole_large_disc_is_large_overall() {
        let img = DynamicImage::ImageLuma8(with_dark_disc(90.0));
        assert_eq!(estimate_severity(&img, IssueClass::Pothole), Some(Severity::Large));
    }

    #[test]
    fn test_bright_flat_pothole_is_small() {
        let img = GrayImage::from_pixel(224, 224, Luma([200]));
        assert_eq!(estimate_from_gray(&img, IssueClass::Pothole), Severity::Small);
    }

    #[test]
    fn test_garbage_texture_raises_severity() {
        let busy = GrayImage::from_fn(224, 224, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 {
                Luma([20])
            } else {
                Luma([230])
            }
        });
        assert_eq!(feature_based(&busy, IssueClass::Garbage), Severity::Large);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let img = with_dark_disc(60.0);
        let first = estimate_from_gray(&img, IssueClass::Garbage);
        for _ in 0..3 {
            assert_eq!(estimate_from_gray(&img, IssueClass::Garbage), first);
        }
    }
}
