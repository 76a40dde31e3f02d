//! HTML extraction for listing and detail pages
//!
//! This module turns fetched markup into the pieces the harvester needs:
//! - Item identifiers from a listing page
//! - Raw field markup from a detail page
//! - The embedded document reference and its cleaned body

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use url::Url;

/// Compiled selectors used to pick raw fields out of a detail page
#[derive(Debug, Clone)]
pub struct DetailSelectors {
    /// Field name and the selector whose matches make up its content
    pub fields: Vec<(String, Selector)>,

    /// Selector and attribute locating the embedded document, if any
    pub auxiliary: Option<(Selector, String)>,
}

/// What a detail page yielded
#[derive(Debug, Clone, Default)]
pub struct ParsedDetail {
    /// Outer HTML per field, empty when the selector matched nothing
    pub fields: BTreeMap<String, String>,

    /// True when at least one field selector matched
    pub matched_any: bool,

    /// Absolute URL of the embedded document
    pub auxiliary_url: Option<String>,
}

/// Extracts item identifiers from a listing page
///
/// Reads `attribute` from every element matched by `item_selector`, in
/// document order. Elements without the attribute, or with a blank value,
/// are skipped.
///
/// # Example
///
/// ```
/// use listing_harvester::fetcher::extract_identifiers;
/// use scraper::Selector;
///
/// let html = r#"<ul><li data-listingid="11">a</li><li data-listingid="22">b</li></ul>"#;
/// let selector = Selector::parse("li[data-listingid]").unwrap();
/// let ids = extract_identifiers(html, &selector, "data-listingid");
/// assert_eq!(ids, vec!["11", "22"]);
/// ```
pub fn extract_identifiers(html: &str, item_selector: &Selector, attribute: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(item_selector)
        .filter_map(|element| element.value().attr(attribute))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Extracts raw field markup and the embedded document reference
///
/// The outer HTML of every match of a field's selector is joined with
/// newlines. The auxiliary reference is resolved against `base_url`.
pub fn extract_fields(html: &str, selectors: &DetailSelectors, base_url: &Url) -> ParsedDetail {
    let document = Html::parse_document(html);
    let mut parsed = ParsedDetail::default();

    for (name, selector) in &selectors.fields {
        let content = document
            .select(selector)
            .map(|element| element.html())
            .collect::<Vec<_>>()
            .join("\n");

        if !content.is_empty() {
            parsed.matched_any = true;
        }
        parsed.fields.insert(name.clone(), content.trim().to_string());
    }

    if let Some((selector, attribute)) = &selectors.auxiliary {
        parsed.auxiliary_url = document
            .select(selector)
            .find_map(|element| element.value().attr(attribute))
            .and_then(|href| resolve_reference(href, base_url));
    }

    parsed
}

/// Returns the inner HTML of `<body>`, or the whole trimmed document when it
/// has no body element
pub fn extract_body(html: &str) -> String {
    static BODY: OnceLock<Regex> = OnceLock::new();
    let body = BODY
        .get_or_init(|| Regex::new(r"(?is)<body[^>]*>(.*?)</body>").expect("valid regex"));

    match body.captures(html).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => html.trim().to_string(),
    }
}

/// Removes embedded code and stylesheet references from markup
///
/// Strips `<script>` and `<style>` blocks along with `<link>` tags.
pub fn strip_non_content(html: &str) -> String {
    static SCRIPT: OnceLock<Regex> = OnceLock::new();
    static STYLE: OnceLock<Regex> = OnceLock::new();
    static LINK: OnceLock<Regex> = OnceLock::new();

    let script = SCRIPT
        .get_or_init(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid regex"));
    let style = STYLE
        .get_or_init(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("valid regex"));
    let link = LINK
        .get_or_init(|| Regex::new(r"(?i)<link\b[^>]*>").expect("valid regex"));

    let cleaned = script.replace_all(html, "");
    let cleaned = style.replace_all(&cleaned, "");
    let cleaned = link.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Resolves an embedded document reference to an absolute HTTP(S) URL
fn resolve_reference(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with("javascript:") || href.starts_with("data:") {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}
