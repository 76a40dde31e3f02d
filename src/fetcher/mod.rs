//! Content retrieval collaborators
//!
//! The harvest core only depends on the two capabilities defined here:
//! - `ListingSource`: resolves the identifiers on one listing page
//! - `ContentFetcher`: retrieves one item's raw fields
//!
//! `HttpSource` implements both over `reqwest` and `scraper`. Tests swap in
//! deterministic stubs.

mod client;
mod http;
mod parser;

pub use client::build_http_client;
pub use http::HttpSource;
pub use parser::{
    extract_body, extract_fields, extract_identifiers, strip_non_content, DetailSelectors,
    ParsedDetail,
};

use crate::model::RawRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by content retrieval collaborators
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {target}")]
    Timeout { target: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Expected content missing for {url}")]
    MissingContent { url: String },

    #[error("Failed to parse {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    /// True for failures caused by an elapsed deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    /// Classifies a transport error from `reqwest`
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                target: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Result type for content retrieval
pub type FetchResult<T> = Result<T, FetchError>;

/// Resolves the item identifiers listed on one page of a listing
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Returns the identifiers on page `page_number` (1-based) for `key`
    ///
    /// An empty vector means the listing has no items on that page.
    async fn list_page(&self, key: &str, page_number: u32) -> FetchResult<Vec<String>>;
}

/// Retrieves one item's raw content
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches the raw record for `id`
    ///
    /// Implementations own whatever request context they open and release it
    /// before returning, on success and on failure.
    async fn fetch(&self, id: &str) -> FetchResult<RawRecord>;
}
