//! Reconciler
//!
//! Left-joins resolved geocode results onto the original batch entries by id and
//! shapes the published `OutputRecord` pairs.
//!
//! # Defaults
//! A result whose id has no source entry is still published, with the entry side
//! zero-filled: `""` for text, `0` for `epoch`, `{}` for `extra_parameters`.
//! Coordinates missing from a result are `0.0`, a missing formatted address is `""`.

use crate::types::{Entry, EntryId, Feed, GeocodeResult, Location, OutputRecord};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::debug;

/// Id → entry lookup over one batch (first occurrence wins)
pub struct EntryIndex<'a> {
    by_id: HashMap<&'a EntryId, &'a Entry>,
}

impl<'a> EntryIndex<'a> {
    pub fn new(entries: &'a [Entry]) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        for entry in entries {
            by_id.entry(&entry.id).or_insert(entry);
        }
        Self { by_id }
    }

    pub fn get(&self, id: &EntryId) -> Option<&'a Entry> {
        self.by_id.get(id).copied()
    }

    /// Entry for `id`, or a zero-valued entry when the join misses
    pub fn get_or_default(&self, id: &EntryId) -> Cow<'a, Entry> {
        match self.get(id) {
            Some(entry) => Cow::Borrowed(entry),
            None => {
                debug!(entry_id = %id, "No source entry for geocode result, using defaults");
                Cow::Owned(Entry::empty(id.clone()))
            }
        }
    }
}

/// Build one output record per resolved result, in result order
///
/// Unresolved results are skipped.
pub fn reconcile(resolved_results: Vec<GeocodeResult>, original_entries: &[Entry]) -> Vec<OutputRecord> {
    let index = EntryIndex::new(original_entries);

    resolved_results
        .into_iter()
        .filter(|r| r.is_resolved)
        .map(|result| {
            let entry = index.get_or_default(&result.id);
            to_output_record(result, &entry)
        })
        .collect()
}

fn to_output_record(result: GeocodeResult, entry: &Entry) -> OutputRecord {
    OutputRecord {
        location: Location {
            formatted_address: result.formatted_address.unwrap_or_default(),
            latitude: result.latitude.unwrap_or(0.0),
            longitude: result.longitude.unwrap_or(0.0),
            northeast_lat: result.northeast_lat.unwrap_or(0.0),
            northeast_lng: result.northeast_lng.unwrap_or(0.0),
            southwest_lat: result.southwest_lat.unwrap_or(0.0),
            southwest_lng: result.southwest_lng.unwrap_or(0.0),
            entry_id: result.id.clone(),
            epoch: entry.epoch,
            channel: entry.channel.clone(),
        },
        feed: Feed {
            id: result.id,
            raw_text: entry.raw_text.clone(),
            channel: entry.channel.clone(),
            extra_parameters: entry.extra_parameters.clone(),
            epoch: entry.epoch,
        },
    }
}
