//! Candidate Merger
//!
//! Unions the accepted candidates of both extraction stages into the geocoding
//! work list. The stages see disjoint entries, so this is a concatenation:
//! pattern candidates first, then model candidates, each in input order.
//! An id is advanced at most once; a repeat (duplicate ids in the input batch)
//! is skipped.

use crate::types::{Candidate, EntryId};
use std::collections::HashSet;
use tracing::warn;

/// One address to geocode
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeJob {
    pub id: EntryId,
    pub address: String,
}

/// Merge accepted candidates into geocode jobs
pub fn merge(accepted_pattern: Vec<Candidate>, accepted_model: Vec<Candidate>) -> Vec<GeocodeJob> {
    let mut seen: HashSet<EntryId> = HashSet::with_capacity(accepted_pattern.len() + accepted_model.len());
    let mut jobs = Vec::with_capacity(accepted_pattern.len() + accepted_model.len());

    for candidate in accepted_pattern.into_iter().chain(accepted_model) {
        if !seen.insert(candidate.id.clone()) {
            warn!(entry_id = %candidate.id, "Duplicate entry id in batch, keeping first candidate");
            continue;
        }
        jobs.push(GeocodeJob {
            id: candidate.id,
            address: candidate.address,
        });
    }

    jobs
}
