//! Message transport
//!
//! The pipeline only needs to publish one payload per batch; consumption and
//! acknowledgement live with the concrete transport (see `kafka`).

#[cfg(feature = "kafka")]
pub mod kafka;

use async_trait::async_trait;
use thiserror::Error;

/// Transport-level failures
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Client setup failed: {0}")]
    Setup(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Consume failed: {0}")]
    Consume(String),
}

/// Sink for encoded output batches
#[async_trait]
pub trait BatchPublisher: Send + Sync {
    /// Publish one payload to `topic`, returning once the broker has acknowledged it
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;
}
