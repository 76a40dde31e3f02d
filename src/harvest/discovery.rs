//! Sequential walk over listing pages

use crate::fetcher::ListingSource;
use crate::model::ListingPage;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why page discovery ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStop {
    /// Every page up to the requested maximum yielded identifiers
    PageCap { pages: u32 },

    /// A page resolved to zero identifiers
    Empty { page: u32 },

    /// A page did not resolve before the listing timeout
    TimedOut { page: u32 },

    /// A page failed to resolve
    Failed { page: u32, message: String },
}

impl DiscoveryStop {
    /// True when discovery ended because the listing ran out, not because of
    /// the page cap
    pub fn is_exhausted(&self) -> bool {
        !matches!(self, DiscoveryStop::PageCap { .. })
    }
}

impl fmt::Display for DiscoveryStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryStop::PageCap { pages } => write!(f, "reached page cap ({})", pages),
            DiscoveryStop::Empty { page } => write!(f, "page {} had no items", page),
            DiscoveryStop::TimedOut { page } => write!(f, "page {} timed out", page),
            DiscoveryStop::Failed { page, message } => {
                write!(f, "page {} failed: {}", page, message)
            }
        }
    }
}

/// Lazy, finite walk over the pages of one listing
///
/// Pages are resolved one at a time, starting at page 1. The walk ends at
/// `max_pages`, or immediately on the first page that is empty, times out,
/// or fails. Once ended it never yields again.
pub struct PageDiscovery {
    source: Arc<dyn ListingSource>,
    key: String,
    max_pages: u32,
    next_page: u32,
    yielded: u32,
    timeout: Duration,
    stop: Option<DiscoveryStop>,
}

impl PageDiscovery {
    pub fn new(
        source: Arc<dyn ListingSource>,
        key: impl Into<String>,
        max_pages: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            key: key.into(),
            max_pages,
            next_page: 1,
            yielded: 0,
            timeout,
            stop: None,
        }
    }

    /// Resolves the next listing page
    ///
    /// Returns `None` once discovery has ended; the reason is then available
    /// from [`PageDiscovery::stop_reason`].
    pub async fn next_page(&mut self) -> Option<ListingPage> {
        if self.stop.is_some() {
            return None;
        }

        let page_number = self.next_page;
        if page_number > self.max_pages {
            self.finish(DiscoveryStop::PageCap {
                pages: self.max_pages,
            });
            return None;
        }
        self.next_page += 1;

        tracing::info!("Resolving listing page {} for '{}'", page_number, self.key);

        let resolved =
            tokio::time::timeout(self.timeout, self.source.list_page(&self.key, page_number)).await;

        let identifiers = match resolved {
            Ok(Ok(identifiers)) => identifiers,
            Ok(Err(e)) if e.is_timeout() => {
                self.finish(DiscoveryStop::TimedOut { page: page_number });
                return None;
            }
            Ok(Err(e)) => {
                self.finish(DiscoveryStop::Failed {
                    page: page_number,
                    message: e.to_string(),
                });
                return None;
            }
            Err(_) => {
                self.finish(DiscoveryStop::TimedOut { page: page_number });
                return None;
            }
        };

        let page = ListingPage::new(page_number, identifiers);
        if page.is_empty() {
            self.finish(DiscoveryStop::Empty { page: page_number });
            return None;
        }

        tracing::info!("Found {} items on page {}", page.len(), page_number);
        self.yielded += 1;
        Some(page)
    }

    /// Why discovery ended, or `None` while pages may still follow
    pub fn stop_reason(&self) -> Option<&DiscoveryStop> {
        self.stop.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.stop.is_some()
    }

    /// Number of pages that yielded identifiers so far
    pub fn pages_yielded(&self) -> u32 {
        self.yielded
    }

    fn finish(&mut self, stop: DiscoveryStop) {
        match &stop {
            DiscoveryStop::PageCap { .. } => {
                tracing::info!("Listing discovery finished: {}", stop)
            }
            DiscoveryStop::Empty { .. } => {
                tracing::info!("Listing discovery stopped: {}", stop)
            }
            _ => tracing::warn!("Listing discovery stopped: {}", stop),
        }
        self.stop = Some(stop);
    }
}
