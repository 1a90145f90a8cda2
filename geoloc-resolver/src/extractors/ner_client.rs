//! NER Client (model stage)
//!
//! Queries a named-entity-recognition service for the location mentioned in free text.
//! Only entries rejected by the pattern stage reach this client.
//!
//! # API Contract
//! - Request: `POST {endpoint}` with JSON `{"text": "...", "id": ...}` and
//!   `Authorization: Bearer {api_key}`
//! - Response: JSON `{"address": "..." | null, "score": 0.0-1.0 | null}`
//!
//! A response without an address (or without a score) is a no-match, not an error.

use crate::types::{Candidate, EntryId, ExtractionError, ModelExtractor};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default timeout for NER requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Remote model extractor
pub struct NerClient {
    /// HTTP client for API requests
    http_client: Client,
    /// Full URL of the extraction endpoint
    endpoint: String,
    /// Bearer token
    api_key: String,
    /// Per-request timeout
    timeout: Duration,
}

impl NerClient {
    /// Create NER client
    ///
    /// # Errors
    /// Returns a config error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> geoloc_common::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                geoloc_common::Error::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelExtractor for NerClient {
    fn name(&self) -> &'static str {
        "NER"
    }

    async fn resolve(&self, raw_text: &str, id: &EntryId) -> Result<Candidate, ExtractionError> {
        debug!(entry_id = %id, text_length = raw_text.len(), "Querying NER API");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&NerRequest { text: raw_text, id })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout(self.timeout)
                } else {
                    ExtractionError::Network(format!("NER API request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api(format!(
                "NER API returned error {}: {}",
                status, body
            )));
        }

        let ner_response: NerResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(format!("Failed to parse NER response: {}", e)))?;

        Ok(candidate_from_response(id, ner_response))
    }
}

// ============================================================================
// NER API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct NerRequest<'a> {
    text: &'a str,
    id: &'a EntryId,
}

#[derive(Debug, Deserialize)]
struct NerResponse {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    score: Option<f32>,
}

fn candidate_from_response(id: &EntryId, response: NerResponse) -> Candidate {
    match (response.address, response.score) {
        (Some(address), Some(score)) if !address.trim().is_empty() => {
            Candidate::new(id.clone(), super::pattern_matcher::normalize_address(&address), score)
        }
        _ => Candidate::no_match(id.clone()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Candidate {
        let response: NerResponse = serde_json::from_str(body).unwrap();
        candidate_from_response(&EntryId::Int(9), response)
    }

    #[test]
    fn test_client_name() {
        let client = NerClient::new("http://localhost:1/ner", "key", DEFAULT_TIMEOUT, "test/0.1")
            .unwrap();
        assert_eq!(client.name(), "NER");
        assert_eq!(client.endpoint(), "http://localhost:1/ner");
    }

    #[test]
    fn test_response_with_address() {
        let c = parse(r#"{"address": "  Via Roma 1 ,  Torino ", "score": 0.82}"#);
        assert_eq!(c.id, EntryId::Int(9));
        assert_eq!(c.address, "Via Roma 1, Torino");
        assert!((c.confidence.unwrap() - 0.82).abs() < 1e-6);
    }

    #[test]
    fn test_response_without_address_is_no_match() {
        assert_eq!(parse(r#"{"address": null, "score": 0.9}"#).confidence, None);
        assert_eq!(parse(r#"{"address": "   ", "score": 0.9}"#).confidence, None);
        assert_eq!(parse(r#"{}"#).confidence, None);
    }

    #[test]
    fn test_response_without_score_is_no_match() {
        assert_eq!(parse(r#"{"address": "Main St"}"#).confidence, None);
    }

    #[test]
    fn test_request_serialization() {
        let id = EntryId::Text("a-1".to_string());
        let body = serde_json::to_value(NerRequest { text: "hello", id: &id }).unwrap();
        assert_eq!(body, serde_json::json!({"text": "hello", "id": "a-1"}));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        // Port 1 is never listening
        let client = NerClient::new(
            "http://127.0.0.1:1/ner",
            "key",
            Duration::from_secs(2),
            "test/0.1",
        )
        .unwrap();
        let result = client.resolve("text", &EntryId::Int(1)).await;
        assert!(result.is_err());
    }
}
