//! geoloc-resolver library interface
//!
//! Resolves free-text location mentions in batches of entries to geocoded places.
//! Exposes the pipeline stages and their seams for the binary and integration tests.

pub mod config;
pub mod driver;
pub mod error;
pub mod extractors;
pub mod geocoding;
pub mod merger;
pub mod pipeline;
pub mod pool;
pub mod reconciler;
pub mod reporting;
pub mod transport;
pub mod types;

pub use crate::driver::{BatchDriver, BatchOutcome};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::pipeline::{BatchOutput, BatchStats, PipelineSettings, ResolutionPipeline};
pub use crate::reporting::{BatchOrigin, ErrorReporter, TracingReporter};
pub use crate::transport::{BatchPublisher, TransportError};
