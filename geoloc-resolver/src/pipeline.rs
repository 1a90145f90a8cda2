//! Batch Resolution Pipeline
//!
//! Sequences one batch through every stage, strictly in order:
//! decode → pattern extraction → model extraction (pattern rejects only) → merge
//! → geocoding → reconciliation → encode.
//!
//! No stage starts before the previous stage's full output exists, and each
//! worker pool is drained before the next one is created, so at most
//! `workers` external calls are in flight at any instant.

use crate::error::{PipelineError, PipelineResult};
use crate::extractors::{run_model_stage, run_pattern_stage};
use crate::geocoding::run_geocode_stage;
use crate::merger::merge;
use crate::reconciler::reconcile;
use crate::types::{Entry, Geocoder, ModelExtractor, OutputRecord, PatternExtractor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default minimum pattern-stage confidence (inclusive)
pub const DEFAULT_PATTERN_THRESHOLD: f32 = 0.7;
/// Default minimum model-stage confidence (inclusive)
pub const DEFAULT_MODEL_THRESHOLD: f32 = 0.5;
/// Default worker cap for each fan-out stage
pub const DEFAULT_WORKERS: usize = 60;
/// Default deadline for a single external call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Tunables for one pipeline instance (immutable after startup)
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub pattern_threshold: f32,
    pub model_threshold: f32,
    pub workers: usize,
    pub call_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            pattern_threshold: DEFAULT_PATTERN_THRESHOLD,
            model_threshold: DEFAULT_MODEL_THRESHOLD,
            workers: DEFAULT_WORKERS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Per-batch counters, logged on completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub entries: usize,
    pub pattern_accepted: usize,
    pub model_calls: usize,
    pub model_accepted: usize,
    pub geocode_calls: usize,
    pub resolved: usize,
    pub published: usize,
}

/// Result of processing one batch
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub records: Vec<OutputRecord>,
    /// JSON-encoded `records`, ready to publish
    pub payload: Vec<u8>,
    pub stats: BatchStats,
}

/// Long-lived pipeline holding the external collaborators
///
/// Constructed once at startup and shared by reference with the batch driver.
pub struct ResolutionPipeline {
    pattern: Arc<dyn PatternExtractor>,
    model: Arc<dyn ModelExtractor>,
    geocoder: Arc<dyn Geocoder>,
    settings: PipelineSettings,
}

impl ResolutionPipeline {
    pub fn new(
        pattern: Arc<dyn PatternExtractor>,
        model: Arc<dyn ModelExtractor>,
        geocoder: Arc<dyn Geocoder>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            pattern,
            model,
            geocoder,
            settings,
        }
    }

    /// Decode a batch payload (JSON array of entries)
    pub fn decode_batch(raw: &[u8]) -> PipelineResult<Vec<Entry>> {
        serde_json::from_slice(raw).map_err(PipelineError::Decode)
    }

    /// Run every stage over already-decoded entries
    pub async fn resolve_entries(&self, entries: &[Entry]) -> (Vec<OutputRecord>, BatchStats) {
        let settings = &self.settings;
        let mut stats = BatchStats {
            entries: entries.len(),
            ..BatchStats::default()
        };

        let pattern_output =
            run_pattern_stage(self.pattern.as_ref(), entries, settings.pattern_threshold);
        stats.pattern_accepted = pattern_output.accepted.len();
        stats.model_calls = pattern_output.rejected.len();

        let model_accepted = run_model_stage(
            self.model.as_ref(),
            &pattern_output.rejected,
            settings.model_threshold,
            settings.workers,
            settings.call_timeout,
        )
        .await;
        stats.model_accepted = model_accepted.len();

        let jobs = merge(pattern_output.accepted, model_accepted);
        stats.geocode_calls = jobs.len();

        let resolved = run_geocode_stage(
            self.geocoder.as_ref(),
            jobs,
            settings.workers,
            settings.call_timeout,
        )
        .await;
        stats.resolved = resolved.len();

        let records = reconcile(resolved, entries);
        stats.published = records.len();

        debug!(?stats, "Batch resolved");
        (records, stats)
    }

    /// Decode, resolve and encode one batch
    ///
    /// A batch that resolves nothing still yields an encoded empty array.
    ///
    /// # Errors
    /// `PipelineError::Decode` for a malformed payload, `PipelineError::Encode`
    /// if the output cannot be serialized.
    pub async fn process_batch(&self, raw: &[u8]) -> PipelineResult<BatchOutput> {
        let entries = Self::decode_batch(raw)?;
        let (records, stats) = self.resolve_entries(&entries).await;
        let payload = serde_json::to_vec(&records).map_err(PipelineError::Encode)?;

        Ok(BatchOutput {
            records,
            payload,
            stats,
        })
    }
}
