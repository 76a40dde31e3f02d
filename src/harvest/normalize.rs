//! Sequential normalization of the collected raw records

use crate::model::{
    description_from_object, text_or_missing, NormalizedRecord, RawRecord, RawRecordQueue,
};
use crate::normalizer::{NormalizeError, NormalizeResult, Normalizer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Drains the raw-record queue through a normalizer, one record at a time
///
/// Produces exactly one output record per raw record, in queue order. A
/// normalizer failure of any kind yields a fallback record and the stage
/// moves on.
pub struct NormalizationStage {
    normalizer: Arc<dyn Normalizer>,
    timeout: Duration,
}

impl NormalizationStage {
    pub fn new(normalizer: Arc<dyn Normalizer>, timeout: Duration) -> Self {
        Self {
            normalizer,
            timeout,
        }
    }

    /// Normalizes every record of `queue` in order
    pub async fn run(&self, queue: &RawRecordQueue) -> Vec<NormalizedRecord> {
        let total = queue.len();
        let mut results = Vec::with_capacity(total);

        for (index, raw) in queue.iter().enumerate() {
            tracing::info!("[{}/{}] Normalizing item {}", index + 1, total, raw.id);
            results.push(self.normalize_one(raw).await);
        }

        results
    }

    /// Normalizes a single record, falling back on failure
    pub async fn normalize_one(&self, raw: &RawRecord) -> NormalizedRecord {
        match self.try_normalize(raw).await {
            Ok(record) => {
                tracing::debug!("Normalized item {}", raw.id);
                record
            }
            Err(e) => {
                tracing::warn!("Failed to normalize item {}: {}", raw.id, e);
                NormalizedRecord::fallback(raw, e.to_string())
            }
        }
    }

    async fn try_normalize(&self, raw: &RawRecord) -> NormalizeResult<NormalizedRecord> {
        let output = tokio::time::timeout(self.timeout, self.normalizer.normalize(raw))
            .await
            .map_err(|_| NormalizeError::Timeout {
                millis: self.timeout.as_millis() as u64,
            })??;

        merge_output(raw, output)
    }
}

/// Combines normalizer output with the raw record's identity
///
/// `id` and `sourceUrl` always come from `raw`, whatever the output says.
/// Missing or empty top-level values become `"-"`; a missing or non-object
/// description becomes empty. The output's own `error` is ignored.
pub fn merge_output(raw: &RawRecord, output: Value) -> NormalizeResult<NormalizedRecord> {
    let Value::Object(fields) = output else {
        return Err(NormalizeError::Malformed(
            "expected a JSON object".to_string(),
        ));
    };

    let description = match fields.get("description") {
        Some(Value::Object(map)) => description_from_object(map),
        _ => BTreeMap::new(),
    };

    Ok(NormalizedRecord {
        id: raw.id.clone(),
        source_url: raw.source_url.clone(),
        title: text_or_missing(fields.get("title")),
        primary_price: text_or_missing(fields.get("primaryPrice")),
        approx_price: text_or_missing(fields.get("approxPrice")),
        description,
        error: None,
    })
}
