use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Sentinel used for any top-level field the normalizer could not fill
pub const MISSING_VALUE: &str = "-";

/// One page of listing results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    page_number: u32,
    identifiers: Vec<String>,
}

impl ListingPage {
    /// Creates a listing page from raw identifiers
    ///
    /// Identifiers are trimmed, blanks are dropped and duplicates keep their
    /// first position, so the page always holds unique identifiers in source
    /// order.
    pub fn new(page_number: u32, identifiers: impl IntoIterator<Item = String>) -> Self {
        let mut seen = HashSet::new();
        let identifiers = identifiers
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Self {
            page_number,
            identifiers,
        }
    }

    /// 1-based page number within the listing
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Identifiers in listing order
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Consumes the page, keeping at most `cap` identifiers when a cap is set
    pub fn into_dispatch(self, cap: Option<usize>) -> Vec<String> {
        let mut identifiers = self.identifiers;
        if let Some(cap) = cap {
            identifiers.truncate(cap);
        }
        identifiers
    }
}

/// Unprocessed per-item content as retrieved from the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Item identifier from the listing page
    pub id: String,

    /// Detail page the content came from
    pub source_url: String,

    /// Raw field content keyed by field name (may be empty strings)
    pub fields: BTreeMap<String, String>,

    /// Embedded document reference found on the detail page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary_content_url: Option<String>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            fields: BTreeMap::new(),
            auxiliary_content_url: None,
        }
    }

    /// Adds or replaces a raw field
    pub fn with_field(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.fields.insert(name.into(), content.into());
        self
    }

    pub fn with_auxiliary_url(mut self, url: impl Into<String>) -> Self {
        self.auxiliary_content_url = Some(url.into());
        self
    }

    /// Returns a field's content, or an empty string when absent
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// A description entry: either text or a nested mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptionValue {
    Text(String),
    Nested(BTreeMap<String, DescriptionValue>),
}

impl DescriptionValue {
    /// Converts a JSON value into a description entry
    ///
    /// Scalars become text, arrays are joined with `", "`, objects recurse.
    /// Returns `None` for nulls and for arrays with no usable element.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::Text(s.trim().to_string())),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            Value::Number(n) => Some(Self::Text(n.to_string())),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(Self::from_json)
                    .map(|item| match item {
                        Self::Text(text) => text,
                        Self::Nested(map) => serde_json::to_string(&map).unwrap_or_default(),
                    })
                    .filter(|text| !text.is_empty())
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(Self::Text(parts.join(", ")))
                }
            }
            Value::Object(map) => Some(Self::Nested(description_from_object(map))),
        }
    }
}

/// Builds a description mapping from a JSON object, dropping null entries
pub(crate) fn description_from_object(
    map: &serde_json::Map<String, Value>,
) -> BTreeMap<String, DescriptionValue> {
    map.iter()
        .filter_map(|(k, v)| DescriptionValue::from_json(v).map(|dv| (k.clone(), dv)))
        .collect()
}

/// The canonical output record for one item
///
/// Every top-level field holds either a meaningful value or `"-"`. The
/// `error` field is only present on fallback records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub id: String,
    pub source_url: String,
    pub title: String,
    pub primary_price: String,
    pub approx_price: String,
    pub description: BTreeMap<String, DescriptionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NormalizedRecord {
    /// Synthesizes the record used when normalization of `raw` failed
    pub fn fallback(raw: &RawRecord, message: impl Into<String>) -> Self {
        Self {
            id: raw.id.clone(),
            source_url: raw.source_url.clone(),
            title: MISSING_VALUE.to_string(),
            primary_price: MISSING_VALUE.to_string(),
            approx_price: MISSING_VALUE.to_string(),
            description: BTreeMap::new(),
            error: Some(message.into()),
        }
    }

    /// True when this record was synthesized after a normalization failure
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Renders a top-level JSON value as text, substituting the sentinel for
/// anything missing or empty
pub(crate) fn text_or_missing(value: Option<&Value>) -> String {
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    };

    if text.is_empty() {
        MISSING_VALUE.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_page_dedupes_in_order() {
        let page = ListingPage::new(
            1,
            vec![
                "A".to_string(),
                " B ".to_string(),
                "A".to_string(),
                "".to_string(),
                "C".to_string(),
            ],
        );

        assert_eq!(page.page_number(), 1);
        assert_eq!(page.identifiers(), &["A", "B", "C"]);
    }

    #[test]
    fn test_listing_page_dispatch_cap() {
        let page = ListingPage::new(2, ["1", "2", "3", "4"].map(String::from));
        assert_eq!(page.clone().into_dispatch(Some(3)), vec!["1", "2", "3"]);
        assert_eq!(page.into_dispatch(None).len(), 4);
    }

    #[test]
    fn test_raw_record_field_access() {
        let raw = RawRecord::new("42", "https://shop.example.com/itm/42")
            .with_field("title", "<span>Shoe</span>")
            .with_field("approxPrice", "");

        assert_eq!(raw.field("title"), "<span>Shoe</span>");
        assert_eq!(raw.field("missing"), "");
    }

    #[test]
    fn test_fallback_record_shape() {
        let raw = RawRecord::new("C", "https://shop.example.com/itm/C");
        let record = NormalizedRecord::fallback(&raw, "oracle unavailable");

        assert_eq!(record.id, "C");
        assert_eq!(record.title, MISSING_VALUE);
        assert_eq!(record.primary_price, MISSING_VALUE);
        assert_eq!(record.approx_price, MISSING_VALUE);
        assert!(record.description.is_empty());
        assert_eq!(record.error.as_deref(), Some("oracle unavailable"));
        assert!(record.is_fallback());
    }

    #[test]
    fn test_normalized_record_serializes_camel_case() {
        let raw = RawRecord::new("A", "https://shop.example.com/itm/A");
        let mut record = NormalizedRecord::fallback(&raw, "boom");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["sourceUrl"], "https://shop.example.com/itm/A");
        assert_eq!(value["primaryPrice"], "-");
        assert_eq!(value["error"], "boom");

        record.error = None;
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_description_value_from_json() {
        let value = json!({
            "Color": "White",
            "Year": 2017,
            "Sizes": ["9", "10", null],
            "Empty": null,
            "Shipping": { "Carrier": "USPS", "Days": 3 }
        });

        let description = match DescriptionValue::from_json(&value) {
            Some(DescriptionValue::Nested(map)) => map,
            other => panic!("expected nested mapping, got {:?}", other),
        };

        assert_eq!(description["Color"], DescriptionValue::Text("White".into()));
        assert_eq!(description["Year"], DescriptionValue::Text("2017".into()));
        assert_eq!(description["Sizes"], DescriptionValue::Text("9, 10".into()));
        assert!(!description.contains_key("Empty"));
        match &description["Shipping"] {
            DescriptionValue::Nested(inner) => {
                assert_eq!(inner["Days"], DescriptionValue::Text("3".into()));
            }
            other => panic!("expected nested shipping, got {:?}", other),
        }
    }

    #[test]
    fn test_text_or_missing() {
        assert_eq!(text_or_missing(Some(&json!("  Nike  "))), "Nike");
        assert_eq!(text_or_missing(Some(&json!(""))), MISSING_VALUE);
        assert_eq!(text_or_missing(Some(&json!(null))), MISSING_VALUE);
        assert_eq!(text_or_missing(Some(&json!(12.5))), "12.5");
        assert_eq!(text_or_missing(None), MISSING_VALUE);
    }
}
