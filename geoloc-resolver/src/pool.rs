//! Bounded fan-out for one pipeline stage
//!
//! A pool exists only for the duration of a `fan_out` call: all jobs are submitted,
//! at most `workers` are in flight at any instant, and the call returns once every
//! job has completed. Nothing outlives the stage.

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::error::Elapsed;

/// Run `call` over every item with at most `workers` futures in flight
///
/// Results are returned in submission order regardless of completion order.
pub async fn fan_out<I, O, F, Fut>(items: Vec<I>, workers: usize, call: F) -> Vec<O>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = O>,
{
    if items.is_empty() {
        return Vec::new();
    }

    stream::iter(items)
        .map(call)
        .buffered(workers.max(1))
        .collect()
        .await
}

/// Bound a single external call by `limit`
pub async fn with_deadline<T>(limit: Duration, call: impl Future<Output = T>) -> Result<T, Elapsed> {
    tokio::time::timeout(limit, call).await
}
