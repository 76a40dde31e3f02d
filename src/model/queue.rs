use crate::model::RawRecord;
use serde::Serialize;

/// Append-only collection of raw records handed from the fetch phase to the
/// normalization stage
///
/// The fetch phase owns the queue mutably while pages are processed; the
/// normalization stage only ever receives a shared reference, so the two
/// phases cannot overlap. Queue order is page order, then completion order
/// within a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawRecordQueue {
    records: Vec<RawRecord>,
}

impl RawRecordQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record at the tail
    pub fn push(&mut self, record: RawRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in queue order
    pub fn iter(&self) -> std::slice::Iter<'_, RawRecord> {
        self.records.iter()
    }

    /// Identifiers in queue order
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}
