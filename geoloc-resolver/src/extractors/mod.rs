//! Address Extraction Stages
//!
//! Two cascading extractors turn raw text into address candidates:
//! 1. **pattern_matcher** - deterministic regex extraction, run synchronously over the batch
//! 2. **ner_client** - remote model extraction, run only for pattern-stage rejects
//!
//! # Error Isolation
//! A failing or timed-out model call yields a no-match candidate for that entry only.
//! Neither stage can fail the batch.

pub mod ner_client;
pub mod pattern_matcher;

pub use ner_client::NerClient;
pub use pattern_matcher::AddressPatternMatcher;

use crate::pool::{fan_out, with_deadline};
use crate::types::{Candidate, Entry, EntryId, ExtractionError, ModelExtractor, PatternExtractor};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Pattern stage split: accepted candidates and the entries left for the model stage
#[derive(Debug)]
pub struct PatternStageOutput<'a> {
    pub accepted: Vec<Candidate>,
    pub rejected: Vec<&'a Entry>,
}

/// Run the pattern extractor over every entry
///
/// Entries whose candidate clears `threshold` (inclusive) are accepted. The rest
/// are rejects, except those whose id was accepted through another entry, so
/// no id can land in both sets.
pub fn run_pattern_stage<'a>(
    extractor: &dyn PatternExtractor,
    entries: &'a [Entry],
    threshold: f32,
) -> PatternStageOutput<'a> {
    let mut accepted = Vec::new();
    let mut below_threshold = Vec::new();

    for entry in entries {
        let candidate = extractor.resolve(&entry.raw_text, &entry.id);
        if candidate.is_accepted(threshold) {
            accepted.push(candidate);
        } else {
            below_threshold.push(entry);
        }
    }

    let accepted_ids: HashSet<&EntryId> = accepted.iter().map(|c| &c.id).collect();
    let rejected: Vec<&Entry> = below_threshold
        .into_iter()
        .filter(|entry| !accepted_ids.contains(&entry.id))
        .collect();

    debug!(
        extractor = extractor.name(),
        accepted = accepted.len(),
        rejected = rejected.len(),
        "Pattern stage complete"
    );

    PatternStageOutput { accepted, rejected }
}

/// Run the model extractor over the pattern-stage rejects
///
/// Exactly one call is made per entry, with at most `workers` in flight. The pool
/// is drained before this function returns. Only accepted candidates are returned.
pub async fn run_model_stage(
    extractor: &dyn ModelExtractor,
    entries: &[&Entry],
    threshold: f32,
    workers: usize,
    call_timeout: Duration,
) -> Vec<Candidate> {
    let candidates = fan_out(entries.to_vec(), workers, move |entry| async move {
        let outcome = with_deadline(call_timeout, extractor.resolve(&entry.raw_text, &entry.id))
            .await
            .unwrap_or_else(|_| Err(ExtractionError::Timeout(call_timeout)));

        match outcome {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(
                    extractor = extractor.name(),
                    entry_id = %entry.id,
                    error = %e,
                    "Model extraction failed (per-entry error isolation)"
                );
                Candidate::no_match(entry.id.clone())
            }
        }
    })
    .await;

    let calls = candidates.len();
    let accepted: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.is_accepted(threshold))
        .collect();

    debug!(
        extractor = extractor.name(),
        calls,
        accepted = accepted.len(),
        "Model stage complete"
    );

    accepted
}

// ============================================================================
// Mock Extractors for Testing
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
