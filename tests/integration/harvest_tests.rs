//! Integration tests for the harvester
//!
//! Most tests drive the pipeline through in-memory listing, fetcher and
//! normalizer stubs. The last ones use wiremock to stand up a listing site and
//! a chat completion endpoint and run the full cycle end-to-end.

use async_trait::async_trait;
use listing_harvester::config::{
    Config, HarvestConfig, NormalizerConfig, OutputConfig, SourceConfig, UserAgentConfig,
};
use listing_harvester::fetcher::{ContentFetcher, FetchError, FetchResult, ListingSource};
use listing_harvester::harvest::{HarvestSettings, Harvester};
use listing_harvester::normalizer::{NormalizeError, NormalizeResult, Normalizer};
use listing_harvester::{harvest, HarvestError, RawRecord};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing stub serving fixed pages; unknown pages are empty
struct FixedListing {
    pages: HashMap<u32, Vec<&'static str>>,
    requested: Mutex<Vec<u32>>,
}

impl FixedListing {
    fn new(pages: Vec<(u32, Vec<&'static str>)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for FixedListing {
    async fn list_page(&self, _key: &str, page_number: u32) -> FetchResult<Vec<String>> {
        self.requested.lock().unwrap().push(page_number);
        Ok(self
            .pages
            .get(&page_number)
            .map(|ids| ids.iter().map(|id| id.to_string()).collect())
            .unwrap_or_default())
    }
}

/// Fetcher stub that fails for selected identifiers and records concurrency
struct StubFetcher {
    failing: HashSet<&'static str>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StubFetcher {
    fn new(failing: &[&'static str], delay: Duration) -> Self {
        Self {
            failing: failing.iter().copied().collect(),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContentFetcher for StubFetcher {
    async fn fetch(&self, id: &str) -> FetchResult<RawRecord> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(id) {
            return Err(FetchError::Http {
                url: format!("https://shop.example.com/itm/{}", id),
                status: 500,
            });
        }

        Ok(
            RawRecord::new(id, format!("https://shop.example.com/itm/{}", id))
                .with_field("title", format!("<span>Item {}</span>", id))
                .with_field("primaryPrice", "<span>$10</span>"),
        )
    }
}

/// Normalizer stub that claims a different identity for every record
struct StubNormalizer {
    failing: HashSet<&'static str>,
}

impl StubNormalizer {
    fn new(failing: &[&'static str]) -> Self {
        Self {
            failing: failing.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl Normalizer for StubNormalizer {
    async fn normalize(&self, record: &RawRecord) -> NormalizeResult<Value> {
        if self.failing.contains(record.id.as_str()) {
            return Err(NormalizeError::Api {
                status: 503,
                message: "overloaded".to_string(),
            });
        }

        Ok(json!({
            "id": "made-up",
            "sourceUrl": "https://elsewhere.example.com",
            "title": format!("Item {}", record.id),
            "primaryPrice": "$10",
            "description": { "Brand": "Nike" }
        }))
    }
}

fn settings(concurrency: usize) -> HarvestSettings {
    HarvestSettings {
        max_concurrent_fetches: concurrency,
        items_per_page: None,
        listing_timeout: Duration::from_secs(5),
        fetch_timeout: Duration::from_secs(5),
        normalize_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_nike_scenario_fetch_and_normalize_failures() {
    let listing = Arc::new(FixedListing::new(vec![(1, vec!["A", "B", "C"])]));
    let fetcher = Arc::new(StubFetcher::new(&["B"], Duration::from_millis(10)));
    let normalizer = Arc::new(StubNormalizer::new(&["C"]));

    let harvester = Harvester::new(listing.clone(), fetcher, normalizer, settings(3));
    let outcome = harvester.harvest("nike", 2).await.unwrap();

    assert_eq!(listing.requested(), vec![1, 2]);
    assert_eq!(outcome.report.pages_processed, 1);
    assert_eq!(outcome.report.identifiers_dispatched, 3);
    assert_eq!(outcome.raw.len(), 2);
    assert_eq!(outcome.records.len(), 2);

    let a = outcome.records.iter().find(|r| r.id == "A").unwrap();
    assert_eq!(a.title, "Item A");
    assert_eq!(a.source_url, "https://shop.example.com/itm/A");
    assert!(!a.is_fallback());

    let c = outcome.records.iter().find(|r| r.id == "C").unwrap();
    assert!(c.is_fallback());
    assert_eq!(c.title, "-");
    assert_eq!(c.primary_price, "-");
    assert_eq!(c.source_url, "https://shop.example.com/itm/C");

    assert!(outcome.records.iter().all(|r| r.id != "B"));
    assert_eq!(outcome.report.fetch_failures, 1);
    assert_eq!(outcome.report.fallbacks, 1);
}

#[tokio::test]
async fn test_identity_comes_from_raw_record() {
    let listing = Arc::new(FixedListing::new(vec![(1, vec!["A", "B"])]));
    let fetcher = Arc::new(StubFetcher::new(&[], Duration::ZERO));
    let normalizer = Arc::new(StubNormalizer::new(&[]));

    let harvester = Harvester::new(listing, fetcher, normalizer, settings(3));
    let outcome = harvester.harvest("nike", 1).await.unwrap();

    for record in &outcome.records {
        assert_ne!(record.id, "made-up");
        assert_eq!(
            record.source_url,
            format!("https://shop.example.com/itm/{}", record.id)
        );
        assert_eq!(record.approx_price, "-");
    }
}

#[tokio::test]
async fn test_single_failure_is_isolated() {
    let listing = Arc::new(FixedListing::new(vec![(1, vec!["V", "W", "X", "Y", "Z"])]));
    let fetcher = Arc::new(StubFetcher::new(&["X"], Duration::from_millis(5)));
    let normalizer = Arc::new(StubNormalizer::new(&[]));

    let harvester = Harvester::new(listing, fetcher, normalizer, settings(3));
    let outcome = harvester.harvest("nike", 1).await.unwrap();

    let ids: HashSet<&str> = outcome.raw.ids().into_iter().collect();
    assert_eq!(ids, HashSet::from(["V", "W", "Y", "Z"]));
    assert_eq!(outcome.records.len(), 4);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_cap() {
    let ids = vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"];
    let listing = Arc::new(FixedListing::new(vec![(1, ids.clone()), (2, ids)]));
    let fetcher = Arc::new(StubFetcher::new(&[], Duration::from_millis(20)));
    let normalizer = Arc::new(StubNormalizer::new(&[]));

    let harvester = Harvester::new(listing, fetcher.clone(), normalizer, settings(3));
    let outcome = harvester.harvest("nike", 2).await.unwrap();

    assert_eq!(fetcher.peak.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.report.peak_concurrency, 3);
    assert_eq!(outcome.report.pages_processed, 2);
    assert_eq!(outcome.records.len(), 20);
}

/// Shared event log written by the ordering stubs
type EventLog = Arc<Mutex<Vec<String>>>;

/// Fetcher that logs when each fetch starts and ends
struct LoggingFetcher {
    log: EventLog,
    slow: &'static str,
}

#[async_trait]
impl ContentFetcher for LoggingFetcher {
    async fn fetch(&self, id: &str) -> FetchResult<RawRecord> {
        self.log.lock().unwrap().push(format!("start {}", id));
        let delay = if id == self.slow { 80 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.log.lock().unwrap().push(format!("end {}", id));

        Ok(RawRecord::new(id, format!("https://shop.example.com/itm/{}", id)))
    }
}

/// Normalizer that logs every call
struct LoggingNormalizer {
    log: EventLog,
}

#[async_trait]
impl Normalizer for LoggingNormalizer {
    async fn normalize(&self, record: &RawRecord) -> NormalizeResult<Value> {
        self.log.lock().unwrap().push(format!("norm {}", record.id));
        Ok(json!({ "title": record.id }))
    }
}

fn position(events: &[String], event: &str) -> usize {
    events
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("missing event '{}' in {:?}", event, events))
}

#[tokio::test]
async fn test_pages_and_phases_do_not_overlap() {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let listing = Arc::new(FixedListing::new(vec![
        (1, vec!["a1", "a2", "a3", "a4"]),
        (2, vec!["b1", "b2"]),
    ]));
    let fetcher = Arc::new(LoggingFetcher {
        log: log.clone(),
        slow: "a4",
    });
    let normalizer = Arc::new(LoggingNormalizer { log: log.clone() });

    let harvester = Harvester::new(listing, fetcher, normalizer, settings(3));
    let outcome = harvester.harvest("nike", 2).await.unwrap();
    assert_eq!(outcome.records.len(), 6);

    let events = log.lock().unwrap().clone();

    // Page 2 starts only after every page 1 fetch, including the slow one, ended
    let last_page_one_end = ["a1", "a2", "a3", "a4"]
        .iter()
        .map(|id| position(&events, &format!("end {}", id)))
        .max()
        .unwrap();
    for id in ["b1", "b2"] {
        assert!(
            position(&events, &format!("start {}", id)) > last_page_one_end,
            "{} started before page 1 finished: {:?}",
            id,
            events
        );
    }

    // Normalization starts only after every fetch ended
    let last_fetch_end = events
        .iter()
        .rposition(|e| e.starts_with("end "))
        .unwrap();
    let first_norm = events
        .iter()
        .position(|e| e.starts_with("norm "))
        .unwrap();
    assert!(last_fetch_end < first_norm, "phases overlapped: {:?}", events);
    assert_eq!(
        events.iter().filter(|e| e.starts_with("norm ")).count(),
        6
    );
}

#[tokio::test]
async fn test_empty_page_ends_discovery() {
    let listing = Arc::new(FixedListing::new(vec![(1, vec!["A"]), (3, vec!["C"])]));
    let fetcher = Arc::new(StubFetcher::new(&[], Duration::ZERO));
    let normalizer = Arc::new(StubNormalizer::new(&[]));

    let harvester = Harvester::new(listing.clone(), fetcher, normalizer, settings(3));
    let outcome = harvester.harvest("nike", 5).await.unwrap();

    assert_eq!(outcome.report.pages_processed, 1);
    assert_eq!(listing.requested(), vec![1, 2]);
    assert_eq!(outcome.raw.ids(), vec!["A"]);
}

#[tokio::test]
async fn test_page_cap_stops_without_extra_request() {
    let listing = Arc::new(FixedListing::new(vec![(1, vec!["A"]), (2, vec!["B"]), (3, vec!["C"])]));
    let fetcher = Arc::new(StubFetcher::new(&[], Duration::ZERO));
    let normalizer = Arc::new(StubNormalizer::new(&[]));

    let harvester = Harvester::new(listing.clone(), fetcher, normalizer, settings(3));
    let outcome = harvester.harvest("nike", 2).await.unwrap();

    assert_eq!(listing.requested(), vec![1, 2]);
    assert_eq!(outcome.raw.ids(), vec!["A", "B"]);
    assert!(!outcome.report.discovery_stop.unwrap().is_exhausted());
}

#[tokio::test]
async fn test_no_results_yields_empty_outcome() {
    let listing = Arc::new(FixedListing::new(Vec::new()));
    let fetcher = Arc::new(StubFetcher::new(&[], Duration::ZERO));
    let normalizer = Arc::new(StubNormalizer::new(&[]));

    let harvester = Harvester::new(listing, fetcher, normalizer, settings(3));
    let outcome = harvester.harvest("nike", 3).await.unwrap();

    assert!(outcome.records.is_empty());
    assert!(outcome.raw.is_empty());
    assert_eq!(outcome.report.pages_processed, 0);
}

fn test_config(base: &str, results_path: &str, api_key_env: &str) -> Config {
    let mut fields = BTreeMap::new();
    fields.insert("title".to_string(), "h1 span".to_string());
    fields.insert("primaryPrice".to_string(), ".price span".to_string());

    Config {
        harvest: HarvestConfig {
            max_concurrent_fetches: 2,
            fetch_timeout_ms: 5_000,
            listing_timeout_ms: 5_000,
            normalize_timeout_ms: 5_000,
            ..HarvestConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        source: SourceConfig {
            listing_url: format!("{}/sch?_nkw={{key}}&_pgn={{page}}", base),
            listing_item_selector: "ul.results > li[data-listingid]".to_string(),
            listing_id_attribute: "data-listingid".to_string(),
            detail_url: format!("{}/itm/{{id}}", base),
            fields,
            auxiliary_selector: None,
            auxiliary_attribute: "src".to_string(),
            auxiliary_field: "fullDescriptionHTML".to_string(),
        },
        normalizer: NormalizerConfig {
            base_url: base.to_string(),
            model: "test-model".to_string(),
            api_key_env: api_key_env.to_string(),
            temperature: None,
        },
        output: OutputConfig {
            results_path: results_path.to_string(),
            raw_path: None,
        },
    }
}

async fn mount_item(server: &MockServer, id: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/itm/{}", id)))
        .respond_with(ResponseTemplate::new(status).set_body_string(format!(
            r#"<html><body><h1><span>Item {id}</span></h1><div class="price"><span>$10</span></div></body></html>"#
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_writes_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sch"))
        .and(query_param("_pgn", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<ul class="results">
                <li data-listingid="A"></li>
                <li data-listingid="B"></li>
                <li data-listingid="C"></li>
            </ul>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sch"))
        .and(query_param("_pgn", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<ul class="results"></ul>"#))
        .mount(&server)
        .await;

    mount_item(&server, "A", 200).await;
    mount_item(&server, "B", 500).await;
    mount_item(&server, "C", 200).await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content":
                r#"{"id":"bogus","title":"Normalized","primaryPrice":"$10","description":{"Brand":"Nike"}}"#
            } }]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let results_path = dir.path().join("out").join("results.json");
    std::env::set_var("HARVEST_TEST_KEY_FULL", "secret");
    let config = test_config(
        &server.uri(),
        &results_path.display().to_string(),
        "HARVEST_TEST_KEY_FULL",
    );

    let outcome = harvest(&config, "nike", 5).await.unwrap();

    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.report.pages_processed, 1);
    assert_eq!(outcome.report.fetch_failures, 1);

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&results_path).unwrap()).unwrap();
    let array = written.as_array().unwrap();
    assert_eq!(array.len(), 2);

    let ids: HashSet<&str> = array.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, HashSet::from(["A", "C"]));
    for record in array {
        assert_eq!(record["title"], "Normalized");
        assert_eq!(record["approxPrice"], "-");
        assert_eq!(record["description"]["Brand"], "Nike");
        assert!(record["sourceUrl"].as_str().unwrap().ends_with(record["id"].as_str().unwrap()));
    }
}

#[tokio::test]
async fn test_full_harvest_missing_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let results_path = dir.path().join("results.json");
    let config = test_config(
        "http://127.0.0.1:9",
        &results_path.display().to_string(),
        "HARVEST_TEST_KEY_NEVER_SET",
    );

    let result = harvest(&config, "nike", 1).await;
    assert!(matches!(
        result,
        Err(HarvestError::Normalize(NormalizeError::MissingCredentials(_)))
    ));
    assert!(!results_path.exists());
}
