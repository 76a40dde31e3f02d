//! Listing Harvester: paginated listing discovery with normalized output
//!
//! This crate walks the pages of a listing source, fetches every discovered
//! item's raw content under a concurrency cap, and turns each raw record into
//! a canonical record through an external normalizer.

pub mod config;
pub mod fetcher;
pub mod harvest;
pub mod model;
pub mod normalizer;
pub mod output;

use thiserror::Error;

/// Main error type for harvest operations
///
/// Only failures that abort a whole run surface as `HarvestError`. Per-item
/// fetch and normalization failures are contained inside the pipeline.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid harvest request: {0}")]
    InvalidRequest(String),

    #[error("Normalizer error: {0}")]
    Normalize(#[from] normalizer::NormalizeError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{harvest, HarvestOutcome, Harvester};
pub use model::{ListingPage, NormalizedRecord, RawRecord, RawRecordQueue};
