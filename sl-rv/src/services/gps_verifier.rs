//! GPS cross-verification
//!
//! Compares the photo's embedded GPS position with the coordinates the
//! reporter submitted. Distance bands:
//!
//! | distance             | status           | adjustment        |
//! |----------------------|------------------|-------------------|
//! | no photo GPS         | no_gps_in_photo  | 0                 |
//! | < 0.5 km, landmarks  | verified         | +10               |
//! | < 0.5 km, none       | good_match       | 0                 |
//! | < 0.5 km, lookup down| degraded         | 0                 |
//! | 0.5 - 5 km           | minor_mismatch   | 0 to -10, linear  |
//! | > 5 km               | spoofing         | -50               |
//!
//! Addresses are looked up for display only and never change the verdict.

use sl_common::Coordinates;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::GpsSettings;
use crate::models::{GpsStatus, GpsVerificationResult, Landmark, PhotoGps};
use crate::services::geocoder::{Lookup, RateLimitedGeocoder};

/// Verdict for a distance and landmark lookup, before any address display
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceAssessment {
    pub status: GpsStatus,
    pub score_adjustment: i32,
    pub is_spoofed: bool,
}

/// Landmark lookup state as far as the verdict is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkEvidence {
    /// Search not needed for this distance band
    NotSearched,
    Found(usize),
    Unavailable,
}

pub struct GpsVerifier {
    geocoder: Arc<RateLimitedGeocoder>,
    settings: GpsSettings,
}

impl GpsVerifier {
    pub fn new(geocoder: Arc<RateLimitedGeocoder>, settings: GpsSettings) -> Self {
        Self { geocoder, settings }
    }

    pub fn settings(&self) -> &GpsSettings {
        &self.settings
    }

    pub fn geocoder(&self) -> &RateLimitedGeocoder {
        &self.geocoder
    }

    pub async fn verify(
        &self,
        photo_gps: Option<PhotoGps>,
        submitted: Coordinates,
    ) -> GpsVerificationResult {
        let Some(photo_gps) = photo_gps else {
            info!(%submitted, "No GPS in photo, skipping verification");
            return GpsVerificationResult::no_photo_gps(submitted);
        };

        let photo = photo_gps.coordinates;
        let distance_km = photo.distance_km(&submitted);
        let mut lookup_errors = Vec::new();

        let search_landmarks = distance_km < self.settings.verified_threshold_km;
        let separate_address = distance_km > self.settings.separate_address_km;

        // The landmark search decides the verdict, so it is polled first and
        // takes the earliest rate limiter slot
        let (landmarks, photo_address, submitted_address) = tokio::join!(
            async {
                if search_landmarks {
                    Some(self.geocoder.find_landmarks(photo).await)
                } else {
                    None
                }
            },
            self.geocoder.reverse_geocode(photo),
            async {
                if separate_address {
                    Some(self.geocoder.reverse_geocode(submitted).await)
                } else {
                    None
                }
            },
        );

        let (nearby_landmarks, evidence) = match landmarks {
            Some(Lookup::Found(landmarks)) => {
                let n = landmarks.len();
                (landmarks, LandmarkEvidence::Found(n))
            }
            Some(Lookup::Unavailable(e)) => {
                lookup_errors.push(format!("landmark_search: {}", e));
                (Vec::new(), LandmarkEvidence::Unavailable)
            }
            None => (Vec::<Landmark>::new(), LandmarkEvidence::NotSearched),
        };

        let photo_address = match photo_address {
            Lookup::Found(address) => address.map(|a| a.short()),
            Lookup::Unavailable(e) => {
                lookup_errors.push(format!("reverse_geocode: {}", e));
                None
            }
        };

        let submitted_address = match submitted_address {
            Some(Lookup::Found(address)) => address.map(|a| a.short()),
            Some(Lookup::Unavailable(e)) => {
                lookup_errors.push(format!("reverse_geocode: {}", e));
                None
            }
            None => photo_address.clone(),
        };

        let assessment = assess_distance(distance_km, evidence, &self.settings);
        let penalty_reason = penalty_reason(&assessment, distance_km, nearby_landmarks.len());

        if assessment.is_spoofed {
            warn!(
                %photo, %submitted, distance_km,
                "GPS spoofing detected"
            );
        } else {
            info!(
                distance_km,
                status = %assessment.status,
                adjustment = assessment.score_adjustment,
                landmarks = nearby_landmarks.len(),
                "GPS verification complete"
            );
        }

        GpsVerificationResult {
            has_photo_gps: true,
            photo_coords: Some(photo),
            submitted_coords: submitted,
            distance_km: Some((distance_km * 1000.0).round() / 1000.0),
            photo_address,
            submitted_address,
            nearby_landmarks,
            is_spoofed: assessment.is_spoofed,
            score_adjustment: assessment.score_adjustment,
            status: assessment.status,
            penalty_reason,
            lookup_errors,
        }
    }
}

/// Verdict for a photo-to-submission distance
///
/// Spoofing is decided on distance alone, so a failed lookup can never
/// mask it.
pub fn assess_distance(
    distance_km: f64,
    landmarks: LandmarkEvidence,
    settings: &GpsSettings,
) -> DistanceAssessment {
    if distance_km > settings.spoofing_threshold_km {
        return DistanceAssessment {
            status: GpsStatus::Spoofing,
            score_adjustment: settings.spoofing_penalty,
            is_spoofed: true,
        };
    }

    if distance_km < settings.verified_threshold_km {
        let (status, score_adjustment) = match landmarks {
            LandmarkEvidence::Found(n) if n >= settings.min_landmarks_for_verified => {
                (GpsStatus::Verified, settings.verified_bonus)
            }
            LandmarkEvidence::Unavailable => (GpsStatus::Degraded, 0),
            _ => (GpsStatus::GoodMatch, 0),
        };
        return DistanceAssessment {
            status,
            score_adjustment,
            is_spoofed: false,
        };
    }

    DistanceAssessment {
        status: GpsStatus::MinorMismatch,
        score_adjustment: minor_mismatch_adjustment(distance_km, settings),
        is_spoofed: false,
    }
}

/// Linear from 0 at the verified cutoff to the maximum penalty at the
/// spoofing cutoff, rounded to the nearest point
pub fn minor_mismatch_adjustment(distance_km: f64, settings: &GpsSettings) -> i32 {
    let span = settings.spoofing_threshold_km - settings.verified_threshold_km;
    if span <= 0.0 {
        return settings.max_mismatch_penalty;
    }
    let t = ((distance_km - settings.verified_threshold_km) / span).clamp(0.0, 1.0);
    (t * settings.max_mismatch_penalty as f64).round() as i32
}

fn penalty_reason(assessment: &DistanceAssessment, distance_km: f64, landmarks: usize) -> String {
    match assessment.status {
        GpsStatus::Spoofing => format!(
            "Photo location is {:.2} km away from submitted location (possible GPS spoofing)",
            distance_km
        ),
        GpsStatus::Verified => format!(
            "Location verified with {} nearby landmark{}",
            landmarks,
            if landmarks == 1 { "" } else { "s" }
        ),
        GpsStatus::GoodMatch => format!(
            "Location matches submitted coordinates ({:.0} m apart)",
            distance_km * 1000.0
        ),
        GpsStatus::Degraded => format!(
            "Location matches submitted coordinates ({:.0} m apart); landmark check unavailable",
            distance_km * 1000.0
        ),
        GpsStatus::MinorMismatch => format!(
            "Minor location mismatch ({:.2} km)",
            distance_km
        ),
        GpsStatus::NoGpsInPhoto => "No GPS data found in photo".to_string(),
    }
}
