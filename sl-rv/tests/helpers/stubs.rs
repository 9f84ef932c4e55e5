//! Deterministic stand-ins for the classifier model and geocoding service

use async_trait::async_trait;
use bytes::Bytes;
use sl_common::Coordinates;
use sl_rv::config::ServiceConfig;
use sl_rv::models::{Address, IssueClass, Landmark, ModelPrediction};
use sl_rv::services::{ClassificationModel, ClassifierError, GeocodeError, GeocodingService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Defaults with a generous geocoding budget so tests never wait on it
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.geocoder.requests_per_second = 1000;
    config.geocoder.burst = 100;
    config.geocoder.timeout_secs = 1;
    config.classifier.timeout_secs = 5;
    config.pipeline.deadline_secs = 20;
    config
}

enum ModelBehaviour {
    Answer(IssueClass, f64),
    Fail,
}

pub struct StubModel {
    behaviour: ModelBehaviour,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubModel {
    pub fn answering(class: IssueClass, confidence: f64) -> Self {
        Self {
            behaviour: ModelBehaviour::Answer(class, confidence),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            behaviour: ModelBehaviour::Fail,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationModel for StubModel {
    fn name(&self) -> &str {
        "stub-model"
    }

    async fn predict(&self, _image: Bytes) -> Result<ModelPrediction, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.behaviour {
            ModelBehaviour::Answer(predicted_class, confidence) => Ok(ModelPrediction {
                predicted_class,
                confidence,
            }),
            ModelBehaviour::Fail => Err(ClassifierError::Unavailable("model server down".into())),
        }
    }
}

pub struct StubGeocoder {
    address: Option<Address>,
    landmarks: Vec<Landmark>,
    fail: bool,
    delay: Option<Duration>,
    reverse_calls: AtomicUsize,
    landmark_calls: AtomicUsize,
}

impl StubGeocoder {
    /// Answers every point with one address and no landmarks
    pub fn new() -> Self {
        Self {
            address: Some(Address {
                display_name: "Mall Road, Lahore, Punjab, Pakistan".into(),
                road: Some("Mall Road".into()),
                city: Some("Lahore".into()),
                state: Some("Punjab".into()),
                country: Some("Pakistan".into()),
                ..Address::default()
            }),
            landmarks: Vec::new(),
            fail: false,
            delay: None,
            reverse_calls: AtomicUsize::new(0),
            landmark_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_landmark(mut self, name: &str) -> Self {
        self.landmarks.push(Landmark {
            name: name.into(),
            kind: "school".into(),
            category: "amenity".into(),
            distance_m: 120.0,
            lat: 31.521,
            lon: 74.359,
        });
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reverse_calls(&self) -> usize {
        self.reverse_calls.load(Ordering::SeqCst)
    }

    pub fn landmark_calls(&self) -> usize {
        self.landmark_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.reverse_calls() + self.landmark_calls()
    }

    async fn respond<T>(&self, value: T) -> Result<T, GeocodeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(GeocodeError::NetworkError("connection refused".into()));
        }
        Ok(value)
    }
}

#[async_trait]
impl GeocodingService for StubGeocoder {
    fn name(&self) -> &'static str {
        "stub-geocoder"
    }

    async fn reverse_geocode(&self, _point: Coordinates) -> Result<Option<Address>, GeocodeError> {
        self.reverse_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(self.address.clone()).await
    }

    async fn find_landmarks(
        &self,
        _point: Coordinates,
        _radius_m: u32,
    ) -> Result<Vec<Landmark>, GeocodeError> {
        self.landmark_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(self.landmarks.clone()).await
    }
}
