//! Data model shared by every harvest stage
//!
//! - `ListingPage`: one page of discovered identifiers
//! - `RawRecord`: per-item content as retrieved from the source
//! - `NormalizedRecord`: the canonical output record
//! - `RawRecordQueue`: the hand-off between the fetch phase and normalization

mod queue;
mod record;

pub use queue::RawRecordQueue;
pub use record::{DescriptionValue, ListingPage, NormalizedRecord, RawRecord, MISSING_VALUE};

pub(crate) use record::{description_from_object, text_or_missing};
