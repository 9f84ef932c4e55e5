//! Photo metadata and GPS verification types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sl_common::Coordinates;

/// GPS position embedded in the photo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoGps {
    pub coordinates: Coordinates,
    /// Metres above sea level, negative below
    pub altitude_m: Option<f64>,
}

/// Metadata read from the image's EXIF block
///
/// `Default` is the "no metadata" value: absent EXIF is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub gps: Option<PhotoGps>,
    /// Camera-local capture time (EXIF carries no zone)
    pub captured_at: Option<NaiveDateTime>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    /// Number of EXIF fields present
    pub field_count: usize,
}

impl PhotoMetadata {
    pub fn has_gps(&self) -> bool {
        self.gps.is_some()
    }
}

/// Reverse-geocoded address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub display_name: String,
    pub road: Option<String>,
    /// Suburb or neighbourhood
    pub suburb: Option<String>,
    /// City, town or village
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postcode: Option<String>,
}

impl Address {
    /// "road, suburb-or-city, state", falling back to the display name
    pub fn short(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(road) = self.road.as_deref() {
            parts.push(road);
        }
        if let Some(area) = self.suburb.as_deref().or(self.city.as_deref()) {
            parts.push(area);
        }
        if let Some(state) = self.state.as_deref() {
            parts.push(state);
        }

        if parts.is_empty() {
            self.display_name.clone()
        } else {
            parts.join(", ")
        }
    }
}

/// Named point of interest near a coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub name: String,
    /// Tag value, e.g. "school" for `amenity=school`
    pub kind: String,
    /// Tag key, e.g. "amenity"
    pub category: String,
    pub distance_m: f64,
    pub lat: f64,
    pub lon: f64,
}

/// GPS cross-verification verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpsStatus {
    /// Photo carries no GPS; neutral
    NoGpsInPhoto,
    /// Close match confirmed by nearby landmarks
    Verified,
    /// Close match, no landmarks nearby
    GoodMatch,
    /// Between the verified and spoofing cutoffs
    MinorMismatch,
    /// Too far apart to be the same place
    #[serde(rename = "spoofing_detected")]
    Spoofing,
    /// Close match, but the landmark lookup failed; neutral
    Degraded,
}

impl GpsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpsStatus::NoGpsInPhoto => "no_gps_in_photo",
            GpsStatus::Verified => "verified",
            GpsStatus::GoodMatch => "good_match",
            GpsStatus::MinorMismatch => "minor_mismatch",
            GpsStatus::Spoofing => "spoofing_detected",
            GpsStatus::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for GpsStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsVerificationResult {
    pub has_photo_gps: bool,
    pub photo_coords: Option<Coordinates>,
    pub submitted_coords: Coordinates,
    /// Rounded to metres; absent without photo GPS
    pub distance_km: Option<f64>,
    pub photo_address: Option<String>,
    pub submitted_address: Option<String>,
    pub nearby_landmarks: Vec<Landmark>,
    pub is_spoofed: bool,
    pub score_adjustment: i32,
    pub status: GpsStatus,
    pub penalty_reason: String,
    /// External lookups that failed or timed out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lookup_errors: Vec<String>,
}

impl GpsVerificationResult {
    pub fn no_photo_gps(submitted: Coordinates) -> Self {
        Self {
            has_photo_gps: false,
            photo_coords: None,
            submitted_coords: submitted,
            distance_km: None,
            photo_address: None,
            submitted_address: None,
            nearby_landmarks: Vec::new(),
            is_spoofed: false,
            score_adjustment: 0,
            status: GpsStatus::NoGpsInPhoto,
            penalty_reason: "No GPS data found in photo".to_string(),
            lookup_errors: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == GpsStatus::Degraded
    }
}
