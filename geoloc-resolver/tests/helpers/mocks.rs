//! Scripted collaborators for pipeline tests
//!
//! Every mock counts its calls and records the ids it was asked about.

use async_trait::async_trait;
use geoloc_resolver::types::{
    Candidate, EntryId, ExtractionError, GeocodeError, GeocodeResult, Geocoder, ModelExtractor,
    PatternExtractor, ResolvedPlace,
};
use geoloc_resolver::{BatchOrigin, BatchPublisher, ErrorReporter, PipelineError, TransportError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Tracks concurrent calls and the peak seen
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Pattern
// ============================================================================

/// Pattern extractor keyed by raw text; unknown text scores nothing
#[derive(Default)]
pub struct ScriptedPattern {
    scripted: HashMap<String, (String, f32)>,
    calls: AtomicUsize,
}

impl ScriptedPattern {
    pub fn with(mut self, raw_text: &str, address: &str, confidence: f32) -> Self {
        self.scripted
            .insert(raw_text.to_string(), (address.to_string(), confidence));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PatternExtractor for ScriptedPattern {
    fn name(&self) -> &'static str {
        "ScriptedPattern"
    }

    fn resolve(&self, raw_text: &str, id: &EntryId) -> Candidate {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripted.get(raw_text) {
            Some((address, confidence)) => Candidate::new(id.clone(), address, *confidence),
            None => Candidate::no_match(id.clone()),
        }
    }
}

// ============================================================================
// Model
// ============================================================================

enum ModelScript {
    Found(String, f32),
    Fails,
}

/// Model extractor keyed by raw text
#[derive(Default)]
pub struct ScriptedModel {
    scripted: HashMap<String, ModelScript>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<EntryId>>,
    pub in_flight: InFlight,
}

impl ScriptedModel {
    pub fn with(mut self, raw_text: &str, address: &str, confidence: f32) -> Self {
        self.scripted.insert(
            raw_text.to_string(),
            ModelScript::Found(address.to_string(), confidence),
        );
        self
    }

    pub fn failing(mut self, raw_text: &str) -> Self {
        self.scripted.insert(raw_text.to_string(), ModelScript::Fails);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<EntryId> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelExtractor for ScriptedModel {
    fn name(&self) -> &'static str {
        "ScriptedModel"
    }

    async fn resolve(&self, raw_text: &str, id: &EntryId) -> Result<Candidate, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(id.clone());
        self.in_flight.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.exit();

        match self.scripted.get(raw_text) {
            Some(ModelScript::Found(address, confidence)) => {
                Ok(Candidate::new(id.clone(), address, *confidence))
            }
            Some(ModelScript::Fails) => Err(ExtractionError::Api("HTTP 503".to_string())),
            None => Ok(Candidate::no_match(id.clone())),
        }
    }
}

// ============================================================================
// Geocoder
// ============================================================================

enum GeocodeScript {
    Resolves(f64, f64),
    Fails,
    Panics,
}

/// Geocoder keyed by address; unknown addresses come back unresolved
#[derive(Default)]
pub struct ScriptedGeocoder {
    scripted: HashMap<String, GeocodeScript>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<EntryId>>,
    pub in_flight: InFlight,
}

impl ScriptedGeocoder {
    pub fn with(mut self, address: &str, lat: f64, lng: f64) -> Self {
        self.scripted
            .insert(address.to_string(), GeocodeScript::Resolves(lat, lng));
        self
    }

    pub fn failing(mut self, address: &str) -> Self {
        self.scripted.insert(address.to_string(), GeocodeScript::Fails);
        self
    }

    pub fn panicking(mut self, address: &str) -> Self {
        self.scripted.insert(address.to_string(), GeocodeScript::Panics);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<EntryId> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for ScriptedGeocoder {
    fn name(&self) -> &'static str {
        "ScriptedGeocoder"
    }

    async fn geocode(&self, address: &str, id: &EntryId) -> Result<GeocodeResult, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(id.clone());
        self.in_flight.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.exit();

        match self.scripted.get(address) {
            Some(GeocodeScript::Resolves(lat, lng)) => Ok(GeocodeResult::resolved(
                id.clone(),
                ResolvedPlace {
                    formatted_address: format!("{}, Resolved", address),
                    latitude: *lat,
                    longitude: *lng,
                    northeast_lat: lat + 0.001,
                    northeast_lng: lng + 0.001,
                    southwest_lat: lat - 0.001,
                    southwest_lng: lng - 0.001,
                },
            )),
            Some(GeocodeScript::Fails) => Err(GeocodeError::Network("connection reset".to_string())),
            Some(GeocodeScript::Panics) => panic!("geocoder bug for '{}'", address),
            None => Ok(GeocodeResult::unresolved(id.clone())),
        }
    }
}

// ============================================================================
// Transport / Reporting
// ============================================================================

/// Publisher that records payloads, or fails every publish
#[derive(Default)]
pub struct RecordingPublisher {
    fail: bool,
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    /// Last published payload decoded as JSON
    pub fn last_json(&self) -> serde_json::Value {
        let published = self.published();
        let (_, payload) = published.last().expect("nothing published");
        serde_json::from_slice(payload).expect("published payload is not JSON")
    }
}

#[async_trait]
impl BatchPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Publish("broker unavailable".to_string()));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    reported: Mutex<Vec<(String, BatchOrigin)>>,
}

impl RecordingReporter {
    pub fn reported(&self) -> Vec<(String, BatchOrigin)> {
        self.reported.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &PipelineError, origin: &BatchOrigin) {
        self.reported
            .lock()
            .unwrap()
            .push((error.to_string(), origin.clone()));
    }
}
