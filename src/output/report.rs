//! Run report for a finished harvest
//!
//! Collects the counts each stage produced and prints them the way the CLI
//! shows a summary after a run.

use crate::harvest::DiscoveryStop;
use chrono::{DateTime, Utc};

/// Summary of one harvest run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Listing key the run searched for
    pub key: String,

    /// Page cap requested by the caller
    pub max_pages: u32,

    /// Pages whose identifiers were dispatched
    pub pages_processed: u32,

    /// Identifiers found across all processed pages
    pub identifiers_discovered: usize,

    /// Identifiers actually fetched after the per-page cap
    pub identifiers_dispatched: usize,

    /// Fetch tasks that produced no raw record
    pub fetch_failures: usize,

    /// Raw records admitted to the normalization stage
    pub raw_records: usize,

    /// Records the normalizer produced successfully
    pub normalized: usize,

    /// Fallback records synthesized after normalizer failures
    pub fallbacks: usize,

    /// Why page discovery ended
    pub discovery_stop: Option<DiscoveryStop>,

    /// Highest number of detail fetches observed in flight at once
    pub peak_concurrency: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl HarvestReport {
    /// Creates an empty report stamped with the current time
    pub fn new(key: impl Into<String>, max_pages: u32) -> Self {
        Self {
            key: key.into(),
            max_pages,
            pages_processed: 0,
            identifiers_discovered: 0,
            identifiers_dispatched: 0,
            fetch_failures: 0,
            raw_records: 0,
            normalized: 0,
            fallbacks: 0,
            discovery_stop: None,
            peak_concurrency: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Total output records
    pub fn total_records(&self) -> usize {
        self.normalized + self.fallbacks
    }

    /// Wall-clock duration in seconds, once finished
    pub fn duration_seconds(&self) -> Option<f64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Share of dispatched identifiers that produced a raw record, in percent
    pub fn fetch_success_rate(&self) -> f64 {
        if self.identifiers_dispatched == 0 {
            return 0.0;
        }
        (self.raw_records as f64 / self.identifiers_dispatched as f64) * 100.0
    }

    /// Share of raw records normalized without fallback, in percent
    pub fn normalize_success_rate(&self) -> f64 {
        if self.raw_records == 0 {
            return 0.0;
        }
        (self.normalized as f64 / self.raw_records as f64) * 100.0
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Report ===\n");

    println!("Request:");
    println!("  Key: {}", report.key);
    println!("  Max pages: {}", report.max_pages);
    println!();

    println!("Discovery:");
    println!("  Pages processed: {}", report.pages_processed);
    println!("  Identifiers discovered: {}", report.identifiers_discovered);
    println!("  Identifiers dispatched: {}", report.identifiers_dispatched);
    if let Some(stop) = &report.discovery_stop {
        println!("  Stopped: {}", stop);
    }
    println!();

    println!("Fetching:");
    println!("  Raw records collected: {}", report.raw_records);
    println!("  Fetch failures: {}", report.fetch_failures);
    println!("  Peak concurrent fetches: {}", report.peak_concurrency);
    println!("  Success Rate: {:.1}%", report.fetch_success_rate());
    println!();

    println!("Normalization:");
    println!("  Normalized: {}", report.normalized);
    println!("  Fallbacks: {}", report.fallbacks);
    println!("  Success Rate: {:.1}%", report.normalize_success_rate());
    println!();

    match report.duration_seconds() {
        Some(seconds) => println!(
            "{} records harvested in {:.1}s",
            report.total_records(),
            seconds
        ),
        None => println!("{} records harvested", report.total_records()),
    }
}
