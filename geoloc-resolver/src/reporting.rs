//! Error reporting
//!
//! Batch-level failures are handed to an `ErrorReporter` together with the
//! location of the offending message. The default reporter emits a structured
//! `tracing` event; deployments can plug in an external telemetry sink.

use crate::error::PipelineError;
use std::fmt;
use tracing::error;

/// Where a batch came from on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOrigin {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl BatchOrigin {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl fmt::Display for BatchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

/// Error-reporting collaborator
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &PipelineError, origin: &BatchOrigin);
}

/// Reports through `tracing` at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &PipelineError, origin: &BatchOrigin) {
        error!(
            topic = %origin.topic,
            partition = origin.partition,
            offset = origin.offset,
            error = %error,
            "Batch failed"
        );
    }
}
