//! Two-phase harvest orchestration
//!
//! Phase 1 walks the listing pages and fetches every page's items through the
//! gated worker pool, accumulating one raw-record queue. Phase 2 starts only
//! after phase 1 has fully finished and normalizes that queue in order.

use crate::config::{Config, HarvestConfig};
use crate::fetcher::{ContentFetcher, HttpSource, ListingSource};
use crate::harvest::discovery::PageDiscovery;
use crate::harvest::gate::ConcurrencyGate;
use crate::harvest::normalize::NormalizationStage;
use crate::harvest::pool::DetailHarvestPool;
use crate::model::{NormalizedRecord, RawRecordQueue};
use crate::normalizer::{ChatCompletionNormalizer, Normalizer};
use crate::output::{write_raw, write_results, HarvestReport};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for one harvester
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    /// Gate capacity for detail fetches
    pub max_concurrent_fetches: usize,

    /// Identifiers dispatched per page, all of them when `None`
    pub items_per_page: Option<usize>,

    pub listing_timeout: Duration,
    pub fetch_timeout: Duration,
    pub normalize_timeout: Duration,
}

impl From<&HarvestConfig> for HarvestSettings {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            max_concurrent_fetches: config.max_concurrent_fetches as usize,
            items_per_page: config.items_per_page.map(|cap| cap as usize),
            listing_timeout: config.listing_timeout(),
            fetch_timeout: config.fetch_timeout(),
            normalize_timeout: config.normalize_timeout(),
        }
    }
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self::from(&HarvestConfig::default())
    }
}

/// Everything a successful harvest produced
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    /// One record per raw record, in queue order
    pub records: Vec<NormalizedRecord>,

    /// The raw-record queue the records were derived from
    pub raw: RawRecordQueue,

    pub report: HarvestReport,
}

/// Wires discovery, fetching and normalization together
pub struct Harvester {
    listing: Arc<dyn ListingSource>,
    fetcher: Arc<dyn ContentFetcher>,
    normalizer: Arc<dyn Normalizer>,
    settings: HarvestSettings,
}

impl Harvester {
    pub fn new(
        listing: Arc<dyn ListingSource>,
        fetcher: Arc<dyn ContentFetcher>,
        normalizer: Arc<dyn Normalizer>,
        settings: HarvestSettings,
    ) -> Self {
        Self {
            listing,
            fetcher,
            normalizer,
            settings,
        }
    }

    /// Builds the HTTP source and chat normalizer described by `config`
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - All collaborators initialized
    /// * `Err(HarvestError)` - A collaborator could not be initialized (bad
    ///   selector, missing API key, HTTP client failure)
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let normalizer = Arc::new(ChatCompletionNormalizer::from_config(config)?);
        let source = Arc::new(HttpSource::from_config(config)?);

        tracing::debug!("Normalizer model: {}", normalizer.model());

        Ok(Self::new(
            source.clone(),
            source,
            normalizer,
            HarvestSettings::from(&config.harvest),
        ))
    }

    /// Runs a complete harvest for `key` over at most `max_pages` pages
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestOutcome)` - One output record per collected raw record
    /// * `Err(HarvestError::InvalidRequest)` - Empty key or `max_pages < 1`
    pub async fn harvest(&self, key: &str, max_pages: u32) -> crate::Result<HarvestOutcome> {
        let key = key.trim();
        if key.is_empty() {
            return Err(HarvestError::InvalidRequest(
                "key cannot be empty".to_string(),
            ));
        }
        if max_pages < 1 {
            return Err(HarvestError::InvalidRequest(format!(
                "max_pages must be >= 1, got {}",
                max_pages
            )));
        }

        let mut report = HarvestReport::new(key, max_pages);
        tracing::info!("Starting harvest for '{}' (up to {} pages)", key, max_pages);

        let raw = self.collect_raw_records(key, max_pages, &mut report).await;
        report.raw_records = raw.len();
        tracing::info!(
            "Fetch phase complete: {} raw records from {} pages",
            raw.len(),
            report.pages_processed
        );

        let stage = NormalizationStage::new(
            Arc::clone(&self.normalizer),
            self.settings.normalize_timeout,
        );
        let records = stage.run(&raw).await;

        report.fallbacks = records.iter().filter(|r| r.is_fallback()).count();
        report.normalized = records.len() - report.fallbacks;
        report.finish();

        tracing::info!(
            "Harvest complete: {} records ({} fallbacks)",
            records.len(),
            report.fallbacks
        );

        Ok(HarvestOutcome {
            records,
            raw,
            report,
        })
    }

    /// Phase 1: discovery and gated detail fetching, page by page
    async fn collect_raw_records(
        &self,
        key: &str,
        max_pages: u32,
        report: &mut HarvestReport,
    ) -> RawRecordQueue {
        let gate = ConcurrencyGate::new(self.settings.max_concurrent_fetches);
        let pool = DetailHarvestPool::new(
            Arc::clone(&self.fetcher),
            gate.clone(),
            self.settings.fetch_timeout,
        );
        let mut discovery = PageDiscovery::new(
            Arc::clone(&self.listing),
            key,
            max_pages,
            self.settings.listing_timeout,
        );

        let mut queue = RawRecordQueue::new();

        while let Some(page) = discovery.next_page().await {
            let page_number = page.page_number();
            let found = page.len();
            let identifiers = page.into_dispatch(self.settings.items_per_page);

            if identifiers.len() < found {
                tracing::debug!(
                    "Dispatching {} of {} items on page {}",
                    identifiers.len(),
                    found,
                    page_number
                );
            }

            report.identifiers_discovered += found;
            report.identifiers_dispatched += identifiers.len();

            let summary = pool.harvest_page(identifiers, &mut queue).await;

            report.pages_processed += 1;
            report.fetch_failures += summary.failed;
            tracing::info!(
                "Page {}: {} of {} items fetched",
                page_number,
                summary.collected,
                summary.dispatched
            );
        }

        report.discovery_stop = discovery.stop_reason().cloned();
        report.peak_concurrency = gate.peak();
        queue
    }
}

/// Runs a harvest from configuration and persists the result artifact
///
/// This is the direct-invocation entry point. It will:
/// 1. Initialize the HTTP source and the normalizer
/// 2. Walk the listing and fetch every item
/// 3. Normalize the collected records
/// 4. Write the result artifact (and the raw queue, when configured)
///
/// A failure to write the artifact fails the whole run.
pub async fn harvest(
    config: &Config,
    key: &str,
    max_pages: u32,
) -> crate::Result<HarvestOutcome> {
    let harvester = Harvester::from_config(config)?;
    let outcome = harvester.harvest(key, max_pages).await?;

    write_results(Path::new(&config.output.results_path), &outcome.records)?;
    if let Some(raw_path) = &config.output.raw_path {
        write_raw(Path::new(raw_path), &outcome.raw)?;
    }

    Ok(outcome)
}
