// Google Geocoding API Client
//
// Concept: Resolve an address string to coordinates plus a bounding box
// Resolution: results[0] of an OK response; ZERO_RESULTS is unresolved, not an error
//
// API Documentation: https://developers.google.com/maps/documentation/geocoding

use crate::types::{EntryId, GeocodeError, GeocodeResult, Geocoder, ResolvedPlace};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Default base URL for Google Maps web services
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Google Geocoding API client
///
/// - Explicit timeouts on every request
/// - Optional client-side rate limit (token bucket) shared by all pool workers
pub struct GoogleGeocoder {
    /// HTTP client with configured timeouts
    client: Client,
    /// Base URL (overridable for testing)
    base_url: String,
    /// Google Maps API key
    api_key: String,
    /// Per-request timeout
    timeout: Duration,
    /// Requests-per-second cap, if configured
    rate_limiter: Option<DirectRateLimiter>,
}

impl GoogleGeocoder {
    /// Create Google geocoder
    ///
    /// # Errors
    /// Returns a config error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> geoloc_common::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                geoloc_common::Error::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout,
            rate_limiter: None,
        })
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cap outbound requests per second (None or 0 = unlimited)
    pub fn with_rate_limit(mut self, requests_per_second: Option<u32>) -> Self {
        self.rate_limiter = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_rate_limited(&self) -> bool {
        self.rate_limiter.is_some()
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    fn name(&self) -> &'static str {
        "GoogleGeocoding"
    }

    async fn ready(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    async fn geocode(&self, address: &str, id: &EntryId) -> Result<GeocodeResult, GeocodeError> {
        debug!(entry_id = %id, %address, "Querying Google Geocoding API");

        let url = format!("{}/geocode/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Timeout(self.timeout)
                } else {
                    GeocodeError::Network(format!("Geocoding request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Api(format!(
                "Geocoding API returned error status: {}",
                status
            )));
        }

        let body: GeocodeResponse = response.json().await.map_err(|e| {
            GeocodeError::Parse(format!("Failed to parse geocoding response: {}", e))
        })?;

        result_from_response(id, body)
    }
}

// ============================================================================
// Geocoding API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeApiResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeApiResult {
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
    viewport: Option<Bounds>,
    bounds: Option<Bounds>,
}

#[derive(Debug, Deserialize)]
struct Bounds {
    northeast: LatLng,
    southwest: LatLng,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn result_from_response(id: &EntryId, response: GeocodeResponse) -> Result<GeocodeResult, GeocodeError> {
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => {
            debug!(entry_id = %id, "Geocoding returned no results");
            return Ok(GeocodeResult::unresolved(id.clone()));
        }
        other => {
            return Err(GeocodeError::Api(format!(
                "Geocoding API status {}: {}",
                other,
                response.error_message.unwrap_or_default()
            )));
        }
    }

    let Some(first) = response.results.into_iter().next() else {
        return Ok(GeocodeResult::unresolved(id.clone()));
    };

    let location = first.geometry.location;
    // Precise points carry no area; fall back to a degenerate box
    let (northeast, southwest) = match first.geometry.viewport.or(first.geometry.bounds) {
        Some(bounds) => (bounds.northeast, bounds.southwest),
        None => (location, location),
    };

    Ok(GeocodeResult::resolved(
        id.clone(),
        ResolvedPlace {
            formatted_address: first.formatted_address,
            latitude: location.lat,
            longitude: location.lng,
            northeast_lat: northeast.lat,
            northeast_lng: northeast.lng,
            southwest_lat: southwest.lat,
            southwest_lng: southwest.lng,
        },
    ))
}

// ============================================================================
// Tests
// ============================================================================
