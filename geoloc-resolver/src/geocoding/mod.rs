//! Geocoding Stage
//!
//! Resolves merged address candidates to coordinates through a bounded pool of
//! concurrent `Geocoder` calls. Failed, timed-out and unresolved lookups are
//! dropped here; only resolved results advance to reconciliation.

pub mod google_client;

pub use google_client::GoogleGeocoder;

use crate::merger::GeocodeJob;
use crate::pool::{fan_out, with_deadline};
use crate::types::{GeocodeError, GeocodeResult, Geocoder};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Geocode every job and keep the resolved results
///
/// One call per job, at most `workers` in flight; the pool is drained before return.
/// `call_timeout` bounds each `geocode` call, not the `ready` wait before it.
/// Output preserves job order.
pub async fn run_geocode_stage(
    geocoder: &dyn Geocoder,
    jobs: Vec<GeocodeJob>,
    workers: usize,
    call_timeout: Duration,
) -> Vec<GeocodeResult> {
    let calls = jobs.len();

    let results = fan_out(jobs, workers, move |job| async move {
        // Rate-limit waits do not count against the call deadline
        geocoder.ready().await;
        let outcome = with_deadline(call_timeout, geocoder.geocode(&job.address, &job.id))
            .await
            .unwrap_or_else(|_| Err(GeocodeError::Timeout(call_timeout)));

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    geocoder = geocoder.name(),
                    entry_id = %job.id,
                    address = %job.address,
                    error = %e,
                    "Geocoding failed (per-entry error isolation)"
                );
                GeocodeResult::unresolved(job.id)
            }
        }
    })
    .await;

    let (resolved, unresolved): (Vec<_>, Vec<_>) =
        results.into_iter().partition(|r| r.is_resolved);

    for result in &unresolved {
        debug!(entry_id = %result.id, "Entry not resolved by geocoder");
    }
    if !unresolved.is_empty() {
        info!(
            geocoder = geocoder.name(),
            unresolved = unresolved.len(),
            "Dropping unresolved geocode results"
        );
    }

    debug!(
        geocoder = geocoder.name(),
        calls,
        resolved = resolved.len(),
        "Geocode stage complete"
    );

    resolved
}

// ============================================================================
// Mock Geocoder for Testing
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
