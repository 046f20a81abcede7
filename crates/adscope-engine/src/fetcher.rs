//! Fan-out fetch of independent resources with a cap on in-flight calls.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use crate::error::SourceError;
use crate::retry::{retry, RetryFailure, RetryPolicy};

/// Result of one [`fetch_all`] batch.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// One entry per resource that finished before the deadline.
    pub results: HashMap<String, Result<T, RetryFailure>>,
    /// Resources abandoned because the batch deadline passed.
    pub pending: Vec<String>,
    pub timed_out: bool,
}

impl<T> BatchOutcome<T> {
    /// Iterates over the resources that failed permanently or exhausted retries.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &RetryFailure)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|f| (id.as_str(), f)))
    }
}

/// Fetches every id in `ids` with at most `concurrency_limit` calls in flight.
///
/// Each fetch is wrapped by [`retry`] with `policy`. Completion order is
/// unspecified. A failing resource is recorded in
/// [`BatchOutcome::results`] and never fails the batch. When `deadline`
/// passes, in-flight fetches are dropped, the rest are never started, and
/// the outcome lists them in [`BatchOutcome::pending`].
///
/// Duplicate ids are fetched once.
pub async fn fetch_all<T, F, Fut>(
    ids: &[String],
    concurrency_limit: usize,
    deadline: Option<Instant>,
    policy: &RetryPolicy,
    on_retry: &(dyn Fn(u32, &SourceError) + Send + Sync),
    fetch: F,
) -> BatchOutcome<T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if seen.insert(id.as_str()) {
            unique.push(id.clone());
        }
    }

    let mut results = HashMap::with_capacity(unique.len());
    let mut timed_out = false;
    {
        let fetch = &fetch;
        let in_flight = stream::iter(unique.iter().cloned())
            .map(|id| async move {
                let result = retry(policy, on_retry, || fetch(id.clone())).await;
                (id, result)
            })
            .buffer_unordered(concurrency_limit.max(1));
        let mut in_flight = std::pin::pin!(in_flight);

        loop {
            let next = match deadline {
                Some(deadline) => {
                    if let Ok(next) = tokio::time::timeout_at(deadline, in_flight.next()).await {
                        next
                    } else {
                        timed_out = true;
                        break;
                    }
                }
                None => in_flight.next().await,
            };
            match next {
                Some((id, result)) => {
                    results.insert(id, result);
                }
                None => break,
            }
        }
        // Dropping the stream here cancels whatever is still in flight.
    }

    let pending: Vec<String> = unique
        .into_iter()
        .filter(|id| !results.contains_key(id))
        .collect();

    let failed = results.values().filter(|r| r.is_err()).count();
    if timed_out {
        tracing::warn!(
            completed = results.len(),
            failed,
            abandoned = pending.len(),
            "batch deadline exceeded; returning partial results"
        );
    } else {
        tracing::debug!(completed = results.len(), failed, "batch fetch finished");
    }

    BatchOutcome {
        results,
        pending,
        timed_out,
    }
}
