//! HTTP implementation of the listing and content capabilities

use crate::config::{Config, SourceConfig};
use crate::fetcher::parser::{
    extract_body, extract_fields, extract_identifiers, strip_non_content, DetailSelectors,
};
use crate::fetcher::{build_http_client, ContentFetcher, FetchError, FetchResult, ListingSource};
use crate::model::RawRecord;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::Selector;
use url::Url;

/// Listing source and content fetcher backed by plain HTTP requests
///
/// Every call issues its own request and releases the response before
/// returning, so no connection state is shared between concurrent fetches
/// beyond the client's pool.
pub struct HttpSource {
    client: Client,
    listing_url: String,
    item_selector: Selector,
    id_attribute: String,
    detail_url: String,
    selectors: DetailSelectors,
    auxiliary_field: String,
}

impl HttpSource {
    /// Creates a source from its configuration and an HTTP client
    ///
    /// # Returns
    ///
    /// * `Ok(HttpSource)` - All selectors compiled
    /// * `Err(ConfigError)` - A selector failed to parse
    pub fn new(config: &SourceConfig, client: Client) -> Result<Self, ConfigError> {
        let item_selector = compile(&config.listing_item_selector)?;

        let fields = config
            .fields
            .iter()
            .map(|(name, selector)| Ok((name.clone(), compile(selector)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let auxiliary = match &config.auxiliary_selector {
            Some(selector) => Some((compile(selector)?, config.auxiliary_attribute.clone())),
            None => None,
        };

        Ok(Self {
            client,
            listing_url: config.listing_url.clone(),
            item_selector,
            id_attribute: config.listing_id_attribute.clone(),
            detail_url: config.detail_url.clone(),
            selectors: DetailSelectors { fields, auxiliary },
            auxiliary_field: config.auxiliary_field.clone(),
        })
    }

    /// Builds the HTTP client from the full configuration and creates the source
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let timeout = config
            .harvest
            .fetch_timeout()
            .max(config.harvest.listing_timeout());
        let client = build_http_client(&config.user_agent, timeout)?;
        Ok(Self::new(&config.source, client)?)
    }

    /// Fills the listing URL template
    ///
    /// Whitespace runs in the key collapse to a single `+`.
    pub fn listing_url_for(&self, key: &str, page_number: u32) -> String {
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ");
        let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();

        self.listing_url
            .replace("{key}", &encoded)
            .replace("{page}", &page_number.to_string())
    }

    /// Fills the detail URL template
    pub fn detail_url_for(&self, id: &str) -> String {
        self.detail_url.replace("{id}", id)
    }

    /// Sends a GET request and returns the body of a successful response
    async fn get_text(&self, url: &str) -> FetchResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }

    /// Retrieves the embedded document and returns its cleaned body
    async fn fetch_auxiliary(&self, url: &str) -> FetchResult<String> {
        let html = self.get_text(url).await?;
        Ok(strip_non_content(&extract_body(&html)))
    }
}

#[async_trait]
impl ListingSource for HttpSource {
    async fn list_page(&self, key: &str, page_number: u32) -> FetchResult<Vec<String>> {
        let url = self.listing_url_for(key, page_number);
        tracing::debug!("Fetching listing page {}: {}", page_number, url);

        let html = self.get_text(&url).await?;
        Ok(extract_identifiers(
            &html,
            &self.item_selector,
            &self.id_attribute,
        ))
    }
}

#[async_trait]
impl ContentFetcher for HttpSource {
    async fn fetch(&self, id: &str) -> FetchResult<RawRecord> {
        let url = self.detail_url_for(id);
        tracing::debug!("Fetching detail page: {}", url);

        let base_url = Url::parse(&url).map_err(|e| FetchError::Parse {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let html = self.get_text(&url).await?;
        let parsed = extract_fields(&html, &self.selectors, &base_url);

        if !parsed.matched_any {
            return Err(FetchError::MissingContent { url });
        }

        let mut record = RawRecord::new(id, url);
        record.fields = parsed.fields;

        if self.selectors.auxiliary.is_some() {
            let auxiliary = match &parsed.auxiliary_url {
                Some(aux_url) => match self.fetch_auxiliary(aux_url).await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::warn!("Failed to fetch embedded document for {}: {}", id, e);
                        String::new()
                    }
                },
                None => String::new(),
            };
            record.fields.insert(self.auxiliary_field.clone(), auxiliary);
            record.auxiliary_content_url = parsed.auxiliary_url;
        }

        Ok(record)
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
