//! Bounded-concurrency detail retrieval for one listing page

use crate::fetcher::{ContentFetcher, FetchError};
use crate::harvest::gate::ConcurrencyGate;
use crate::model::{RawRecord, RawRecordQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Outcome counts for one page's fetch phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageHarvest {
    /// Fetch tasks launched
    pub dispatched: usize,

    /// Raw records appended to the queue
    pub collected: usize,

    /// Tasks that produced no record
    pub failed: usize,
}

/// Runs one fetch task per identifier, throttled by a shared gate
///
/// Every task holds a gate permit for the duration of its fetch and owns its
/// failure: a failed or timed-out fetch is logged and yields no record, and
/// never disturbs sibling tasks.
pub struct DetailHarvestPool {
    fetcher: Arc<dyn ContentFetcher>,
    gate: ConcurrencyGate,
    fetch_timeout: Duration,
}

impl DetailHarvestPool {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        gate: ConcurrencyGate,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            gate,
            fetch_timeout,
        }
    }

    /// Fetches every identifier of one page and appends the successes to `queue`
    ///
    /// All tasks are launched at once and the gate limits how many run. This
    /// returns only after every task has finished, so the next page's fetches
    /// can never overlap this page's. Records are appended in completion
    /// order.
    pub async fn harvest_page(
        &self,
        identifiers: Vec<String>,
        queue: &mut RawRecordQueue,
    ) -> PageHarvest {
        let mut summary = PageHarvest {
            dispatched: identifiers.len(),
            ..PageHarvest::default()
        };

        let mut tasks = JoinSet::new();
        for id in identifiers {
            let fetcher = Arc::clone(&self.fetcher);
            let gate = self.gate.clone();
            let timeout = self.fetch_timeout;
            tasks.spawn(fetch_one(fetcher, gate, id, timeout));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(record)) => {
                    queue.push(record);
                    summary.collected += 1;
                }
                Ok(None) => summary.failed += 1,
                Err(e) => {
                    tracing::error!("Fetch task aborted: {}", e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

/// One isolated fetch task
///
/// The permit is held only while this future runs and is released on every
/// exit path, including the timeout.
async fn fetch_one(
    fetcher: Arc<dyn ContentFetcher>,
    gate: ConcurrencyGate,
    id: String,
    timeout: Duration,
) -> Option<RawRecord> {
    let _permit = match gate.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            tracing::warn!("Failed to acquire fetch permit for {}: {}", id, e);
            return None;
        }
    };

    tracing::info!("-> Fetching item {}", id);

    let result = match tokio::time::timeout(timeout, fetcher.fetch(&id)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout { target: id.clone() }),
    };

    match result {
        Ok(record) => {
            tracing::debug!("Fetched item {} ({} fields)", id, record.fields.len());
            Some(record)
        }
        Err(e) => {
            tracing::warn!("Failed to fetch item {}: {}", id, e);
            None
        }
    }
}
