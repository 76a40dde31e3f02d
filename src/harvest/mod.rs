//! Harvest pipeline
//!
//! This module contains the core of the harvester:
//! - `ConcurrencyGate`: permit pool bounding in-flight detail fetches
//! - `PageDiscovery`: sequential walk over listing pages
//! - `DetailHarvestPool`: gated, failure-isolated detail fetching per page
//! - `NormalizationStage`: sequential normalization with fallback records
//! - `Harvester`: the two-phase orchestration tying them together

mod discovery;
mod gate;
mod normalize;
mod orchestrator;
mod pool;

pub use discovery::{DiscoveryStop, PageDiscovery};
pub use gate::{ConcurrencyGate, GatePermit};
pub use normalize::{merge_output, NormalizationStage};
pub use orchestrator::{harvest, HarvestOutcome, HarvestSettings, Harvester};
pub use pool::{DetailHarvestPool, PageHarvest};
