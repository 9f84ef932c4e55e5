//! Reverse geocoding and landmark search
//!
//! [`GeocodingService`] is the raw external capability; [`OsmClient`] talks
//! to Nominatim-compatible and Overpass-compatible endpoints.
//! [`RateLimitedGeocoder`] puts every call behind the shared
//! [`RateLimiter`] and a per-call timeout, and turns failures into
//! [`Lookup::Unavailable`] so GPS verification can continue best-effort.

use async_trait::async_trait;
use serde::Deserialize;
use sl_common::Coordinates;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GeocoderSettings;
use crate::models::{Address, Landmark};
use crate::services::rate_limiter::RateLimiter;

/// Tag keys that make a named OSM element a landmark, in priority order
pub const LANDMARK_CATEGORIES: [&str; 7] = [
    "amenity", "building", "shop", "highway", "leisure", "natural", "historic",
];

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(Coordinates),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// External location lookups
#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Service identifier for logs
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the service has no address for the point
    async fn reverse_geocode(&self, point: Coordinates) -> Result<Option<Address>, GeocodeError>;

    /// Named landmarks within `radius_m`, nearest first
    async fn find_landmarks(
        &self,
        point: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<Landmark>, GeocodeError>;
}

// ============================================================================
// OpenStreetMap client
// ============================================================================

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    #[serde(default)]
    address: HashMap<String, String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

/// Nominatim + Overpass client
pub struct OsmClient {
    http: reqwest::Client,
    reverse_url: String,
    landmark_url: String,
    max_landmarks: usize,
}

impl OsmClient {
    pub fn new(settings: &GeocoderSettings) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .build()
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        Ok(Self {
            http,
            reverse_url: settings.reverse_url.clone(),
            landmark_url: settings.landmark_url.clone(),
            max_landmarks: settings.max_landmarks,
        })
    }
}

#[async_trait]
impl GeocodingService for OsmClient {
    fn name(&self) -> &'static str {
        "openstreetmap"
    }

    async fn reverse_geocode(&self, point: Coordinates) -> Result<Option<Address>, GeocodeError> {
        debug!(%point, url = %self.reverse_url, "Reverse geocoding");

        let response = self
            .http
            .get(&self.reverse_url)
            .query(&[
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "18".to_string()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodeError::ApiError(status.as_u16(), error_text));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::ParseError(e.to_string()))?;

        let address = parse_nominatim(body);
        if let Some(address) = &address {
            info!(%point, address = %address.short(), "Reverse geocoded");
        }
        Ok(address)
    }

    async fn find_landmarks(
        &self,
        point: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<Landmark>, GeocodeError> {
        let query = build_overpass_query(point, radius_m, self.max_landmarks);
        debug!(%point, radius_m, "Searching landmarks");

        let response = self
            .http
            .post(&self.landmark_url)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodeError::ApiError(status.as_u16(), error_text));
        }

        let body: OverpassResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::ParseError(e.to_string()))?;

        let landmarks = parse_overpass(body, point, self.max_landmarks);
        info!(%point, found = landmarks.len(), "Landmark search complete");
        Ok(landmarks)
    }
}

fn parse_nominatim(body: NominatimResponse) -> Option<Address> {
    if let Some(error) = body.error {
        debug!(error = %error, "Nominatim returned no address");
        return None;
    }

    let first = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| body.address.get(*k))
            .find(|v| !v.trim().is_empty())
            .cloned()
    };

    let address = Address {
        road: first(&["road", "highway"]),
        suburb: first(&["suburb", "neighbourhood"]),
        city: first(&["city", "town", "village"]),
        state: first(&["state", "province"]),
        country: first(&["country"]),
        postcode: first(&["postcode"]),
        display_name: body
            .display_name
            .clone()
            .unwrap_or_else(|| "Unknown location".to_string()),
    };
    Some(address)
}

/// Overpass QL for named amenities, shops, buildings and roads
pub fn build_overpass_query(point: Coordinates, radius_m: u32, max_landmarks: usize) -> String {
    let around = format!("(around:{},{},{})", radius_m, point.lat, point.lon);
    format!(
        "[out:json][timeout:15];\n(\n  \
         node[\"name\"][\"amenity\"]{a};\n  \
         node[\"name\"][\"shop\"]{a};\n  \
         node[\"name\"][\"building\"]{a};\n  \
         way[\"name\"][\"amenity\"]{a};\n  \
         way[\"name\"][\"shop\"]{a};\n  \
         way[\"name\"][\"building\"]{a};\n  \
         way[\"name\"][\"highway\"]{a};\n\
         );\nout center {limit};",
        a = around,
        limit = max_landmarks * 2
    )
}

fn parse_overpass(body: OverpassResponse, center: Coordinates, max_landmarks: usize) -> Vec<Landmark> {
    let mut landmarks: Vec<Landmark> = body
        .elements
        .into_iter()
        .filter_map(|element| {
            let name = element.tags.get("name")?.trim().to_string();
            if name.is_empty() {
                return None;
            }

            let (lat, lon) = match element.element_type.as_str() {
                "node" => (element.lat?, element.lon?),
                "way" => {
                    let c = element.center.as_ref()?;
                    (c.lat, c.lon)
                }
                _ => return None,
            };

            let (kind, category) = LANDMARK_CATEGORIES
                .iter()
                .find_map(|cat| element.tags.get(*cat).map(|v| (v.clone(), cat.to_string())))
                .unwrap_or_else(|| ("unknown".to_string(), "other".to_string()));

            let distance_m = center.distance_km(&Coordinates::new(lat, lon)) * 1000.0;

            Some(Landmark {
                name,
                kind,
                category,
                distance_m: (distance_m * 10.0).round() / 10.0,
                lat,
                lon,
            })
        })
        .collect();

    landmarks.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    landmarks.truncate(max_landmarks);
    landmarks
}

// ============================================================================
// Rate-limited wrapper
// ============================================================================

/// Best-effort lookup result
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    /// Lookup failed or timed out; carries the error text
    Unavailable(String),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Unavailable(_) => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Lookup::Unavailable(_))
    }
}

/// Geocoding behind the shared politeness budget
pub struct RateLimitedGeocoder {
    service: Arc<dyn GeocodingService>,
    limiter: Arc<RateLimiter>,
    timeout: Duration,
    search_radius_m: u32,
}

impl RateLimitedGeocoder {
    pub fn new(
        service: Arc<dyn GeocodingService>,
        limiter: Arc<RateLimiter>,
        timeout: Duration,
        search_radius_m: u32,
    ) -> Self {
        Self {
            service,
            limiter,
            timeout,
            search_radius_m,
        }
    }

    pub fn search_radius_m(&self) -> u32 {
        self.search_radius_m
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub async fn reverse_geocode(&self, point: Coordinates) -> Lookup<Option<Address>> {
        self.limited("reverse_geocode", point, self.service.reverse_geocode(point))
            .await
    }

    pub async fn find_landmarks(&self, point: Coordinates) -> Lookup<Vec<Landmark>> {
        self.limited(
            "landmark_search",
            point,
            self.service.find_landmarks(point, self.search_radius_m),
        )
        .await
    }

    /// Acquire a slot, then run `call`; both count against the timeout
    async fn limited<T, F>(&self, operation: &'static str, point: Coordinates, call: F) -> Lookup<T>
    where
        F: Future<Output = Result<T, GeocodeError>>,
    {
        // Never spend budget on a point the service cannot answer for
        if !point.is_valid() {
            let error = GeocodeError::InvalidCoordinates(point);
            warn!(operation, %point, "Skipping lookup for invalid coordinates");
            return Lookup::Unavailable(error.to_string());
        }

        let guarded = async {
            self.limiter.acquire().await;
            call.await
        };

        match tokio::time::timeout(self.timeout, guarded).await {
            Ok(Ok(value)) => Lookup::Found(value),
            Ok(Err(e)) => {
                warn!(operation, service = self.service.name(), %point, error = %e, "Geocoding lookup failed");
                Lookup::Unavailable(e.to_string())
            }
            Err(_) => {
                let error = GeocodeError::Timeout(self.timeout);
                warn!(operation, service = self.service.name(), %point, "Geocoding lookup timed out");
                Lookup::Unavailable(error.to_string())
            }
        }
    }
}
