//! Error types for geoloc-resolver
//!
//! Per-entry failures never surface here; they are absorbed inside the extraction
//! and geocoding stages. `PipelineError` covers what can go wrong with a whole batch.

use crate::transport::TransportError;
use thiserror::Error;

/// Batch-level pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Payload is not a JSON array of entries (not retried)
    #[error("Malformed batch payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// Output records could not be serialized
    #[error("Failed to encode output: {0}")]
    Encode(#[source] serde_json::Error),

    /// Output could not be published; the batch is not acknowledged
    #[error("Output not published: {0}")]
    Publish(#[from] TransportError),

    /// Unexpected panic while processing the batch
    #[error("Pipeline panicked: {0}")]
    Panicked(String),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
