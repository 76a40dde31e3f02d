//! Output module for persisting harvest results
//!
//! This module handles:
//! - Writing the result artifact as a JSON array
//! - Dumping the raw-record queue for inspection
//! - Summarizing a run

mod report;

pub use report::{print_report, HarvestReport};

use crate::model::{NormalizedRecord, RawRecordQueue};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes the result artifact as a pretty-printed JSON array, in harvest order
///
/// # Arguments
///
/// * `path` - Destination file; parent directories are created as needed
/// * `records` - The normalized records
pub fn write_results(path: &Path, records: &[NormalizedRecord]) -> OutputResult<()> {
    write_json(path, &records)?;
    tracing::info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

/// Writes the raw-record queue as a pretty-printed JSON array
pub fn write_raw(path: &Path, queue: &RawRecordQueue) -> OutputResult<()> {
    write_json(path, queue)?;
    tracing::info!("Saved {} raw records to {}", queue.len(), path.display());
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> OutputResult<()> {
    let io_err = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
