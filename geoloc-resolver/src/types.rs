//! Core Types and Trait Definitions for geoloc-resolver
//!
//! Defines the batch data model and the collaborator seams of the resolution pipeline:
//! - **Extraction:** `PatternExtractor` (in-process), `ModelExtractor` (remote)
//! - **Geocoding:** `Geocoder` (remote)
//!
//! Entries, candidates and geocode results live only for the duration of one batch.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Input
// ============================================================================

/// Entry identifier as supplied by the producer (JSON integer or string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::Int(id) => write!(f, "{}", id),
            EntryId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        EntryId::Int(id)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        EntryId::Text(id.to_string())
    }
}

/// One raw location mention in an input batch
///
/// Missing or `null` optional fields decode to their zero value: `""` for text,
/// `0` for `epoch`, `{}` for `extra_parameters`. A fractional `epoch` is truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: String,
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub epoch: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extra_parameters: serde_json::Map<String, serde_json::Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Integer or fractional epoch seconds, `null` as 0
fn epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Epoch {
        Whole(i64),
        Fractional(f64),
    }

    Ok(match Option::<Epoch>::deserialize(deserializer)? {
        Some(Epoch::Whole(secs)) => secs,
        // Saturating cast; NaN cannot occur in JSON
        Some(Epoch::Fractional(secs)) => secs.trunc() as i64,
        None => 0,
    })
}

impl Entry {
    /// Zero-valued entry for an id that has no source attributes
    pub fn empty(id: EntryId) -> Self {
        Self {
            id,
            raw_text: String::new(),
            channel: String::new(),
            epoch: 0,
            extra_parameters: serde_json::Map::new(),
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Address candidate produced by an extraction stage
///
/// `confidence` is `None` when the extractor found no address at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: EntryId,
    pub address: String,
    pub confidence: Option<f32>,
}

impl Candidate {
    /// Create candidate with clamped confidence (0.0-1.0)
    pub fn new(id: EntryId, address: impl Into<String>, confidence: f32) -> Self {
        Self {
            id,
            address: address.into(),
            confidence: Some(confidence.clamp(0.0, 1.0)),
        }
    }

    /// Candidate for an entry where nothing was found (or the extractor failed)
    pub fn no_match(id: EntryId) -> Self {
        Self {
            id,
            address: String::new(),
            confidence: None,
        }
    }

    /// Inclusive acceptance check against a stage threshold
    pub fn is_accepted(&self, threshold: f32) -> bool {
        self.confidence.is_some_and(|c| c >= threshold)
    }
}

/// Deterministic, in-process extraction
pub trait PatternExtractor: Send + Sync {
    /// Extractor name for logging
    fn name(&self) -> &'static str;

    /// Always returns a candidate; non-matches carry low or no confidence
    fn resolve(&self, raw_text: &str, id: &EntryId) -> Candidate;
}

/// Model-based extraction backed by an external service
#[async_trait::async_trait]
pub trait ModelExtractor: Send + Sync {
    /// Extractor name for logging
    fn name(&self) -> &'static str;

    /// Extract an address candidate from raw text
    ///
    /// # Errors
    /// Returns `ExtractionError` when the remote call fails. The model stage
    /// turns any error into a non-accepted candidate (per-entry error isolation).
    async fn resolve(&self, raw_text: &str, id: &EntryId) -> Result<Candidate, ExtractionError>;
}

/// Extraction error
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// External API error
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Call exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

// ============================================================================
// Geocoding
// ============================================================================

/// Coordinates and bounding box for a resolved address
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub northeast_lat: f64,
    pub northeast_lng: f64,
    pub southwest_lat: f64,
    pub southwest_lng: f64,
}

/// Geocoding outcome for one candidate
///
/// All fields other than `id`/`is_resolved` are `None` unless `is_resolved` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub id: EntryId,
    pub is_resolved: bool,
    pub formatted_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub northeast_lat: Option<f64>,
    pub northeast_lng: Option<f64>,
    pub southwest_lat: Option<f64>,
    pub southwest_lng: Option<f64>,
}

impl GeocodeResult {
    pub fn resolved(id: EntryId, place: ResolvedPlace) -> Self {
        Self {
            id,
            is_resolved: true,
            formatted_address: Some(place.formatted_address),
            latitude: Some(place.latitude),
            longitude: Some(place.longitude),
            northeast_lat: Some(place.northeast_lat),
            northeast_lng: Some(place.northeast_lng),
            southwest_lat: Some(place.southwest_lat),
            southwest_lng: Some(place.southwest_lng),
        }
    }

    pub fn unresolved(id: EntryId) -> Self {
        Self {
            id,
            is_resolved: false,
            formatted_address: None,
            latitude: None,
            longitude: None,
            northeast_lat: None,
            northeast_lng: None,
            southwest_lat: None,
            southwest_lng: None,
        }
    }
}

/// Address → coordinates resolution backed by an external service
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocoder name for logging
    fn name(&self) -> &'static str;

    /// Wait until the next request may be sent
    ///
    /// Awaited before each `geocode` call, outside its deadline. Clients with a
    /// request-rate cap block here; the default returns immediately.
    async fn ready(&self) {}

    /// Resolve an address
    ///
    /// An address the service does not know is `Ok` with `is_resolved = false`.
    ///
    /// # Errors
    /// Returns `GeocodeError` when the remote call fails. The geocode stage
    /// turns any error into an unresolved result.
    async fn geocode(&self, address: &str, id: &EntryId) -> Result<GeocodeResult, GeocodeError>;
}

/// Geocoding error
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// External API error (non-OK status)
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Call exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}

// ============================================================================
// Output
// ============================================================================

/// Geocoded location with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub formatted_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub northeast_lat: f64,
    pub northeast_lng: f64,
    pub southwest_lat: f64,
    pub southwest_lng: f64,
    pub entry_id: EntryId,
    pub epoch: i64,
    pub channel: String,
}

/// Original entry attributes echoed downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: EntryId,
    pub raw_text: String,
    pub channel: String,
    pub extra_parameters: serde_json::Map<String, serde_json::Value>,
    pub epoch: i64,
}

/// One published record per resolved entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub location: Location,
    pub feed: Feed,
}

// ============================================================================
// Tests
// ============================================================================
