use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    pub output: OutputConfig,
}

/// Harvest pipeline behavior
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Maximum number of detail fetches in flight at once
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Maximum identifiers dispatched per listing page (no cap when absent)
    #[serde(rename = "items-per-page", default)]
    pub items_per_page: Option<u32>,

    /// Pages to walk when the caller does not say otherwise
    #[serde(rename = "default-max-pages", default = "default_max_pages")]
    pub default_max_pages: u32,

    /// Timeout for resolving one listing page (milliseconds)
    #[serde(rename = "listing-timeout-ms", default = "default_listing_timeout_ms")]
    pub listing_timeout_ms: u64,

    /// Timeout for fetching one item's detail content (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Timeout for one normalizer call (milliseconds)
    #[serde(rename = "normalize-timeout-ms", default = "default_normalize_timeout_ms")]
    pub normalize_timeout_ms: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            items_per_page: None,
            default_max_pages: default_max_pages(),
            listing_timeout_ms: default_listing_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            normalize_timeout_ms: default_normalize_timeout_ms(),
        }
    }
}

impl HarvestConfig {
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn normalize_timeout(&self) -> Duration {
        Duration::from_millis(self.normalize_timeout_ms)
    }
}

fn default_max_concurrent_fetches() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    1
}

fn default_listing_timeout_ms() -> u64 {
    60_000
}

fn default_fetch_timeout_ms() -> u64 {
    60_000
}

fn default_normalize_timeout_ms() -> u64 {
    120_000
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Where listings and item details come from
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Listing page URL template with `{key}` and `{page}` placeholders
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// CSS selector matching one element per listed item
    #[serde(rename = "listing-item-selector")]
    pub listing_item_selector: String,

    /// Attribute of the listed element that carries the item identifier
    #[serde(rename = "listing-id-attribute", default = "default_id_attribute")]
    pub listing_id_attribute: String,

    /// Detail page URL template with an `{id}` placeholder
    #[serde(rename = "detail-url")]
    pub detail_url: String,

    /// Raw field name to CSS selector
    pub fields: BTreeMap<String, String>,

    /// Selector for an embedded document reference on the detail page
    #[serde(rename = "auxiliary-selector", default)]
    pub auxiliary_selector: Option<String>,

    /// Attribute holding the embedded document URL
    #[serde(rename = "auxiliary-attribute", default = "default_auxiliary_attribute")]
    pub auxiliary_attribute: String,

    /// Raw field that receives the embedded document's cleaned body
    #[serde(rename = "auxiliary-field", default = "default_auxiliary_field")]
    pub auxiliary_field: String,
}

fn default_id_attribute() -> String {
    "data-listingid".to_string()
}

fn default_auxiliary_attribute() -> String {
    "src".to_string()
}

fn default_auxiliary_field() -> String {
    "fullDescriptionHTML".to_string()
}

/// Chat-completion normalizer settings
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON result artifact
    #[serde(rename = "results-path")]
    pub results_path: String,

    /// Optional path for a JSON dump of the raw-record queue
    #[serde(rename = "raw-path", default)]
    pub raw_path: Option<String>,
}
