//! Raw bar sources and structured error types.
//!
//! The `RawBarSource` trait abstracts over where raw bars come from (CSV
//! files, JSON dumps, in-memory fixtures) so the pipeline never touches I/O.
//! Sources return bars in file order; concatenating sources with `load_all`
//! defines the ingestion order that duplicate resolution depends on.

pub mod csv_source;
pub mod json_source;
pub mod timestamp;

pub use csv_source::CsvSource;
pub use json_source::JsonSource;
pub use timestamp::parse_timestamp;

use crate::domain::RawBar;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Structured error types for loading raw bars.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `line` is the 1-based CSV line, or the 1-based record index for JSON.
    #[error("{}:{line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("unsupported input format for {} (expected .csv or .json)", .path.display())]
    UnsupportedFormat { path: PathBuf },
}

/// Trait for raw bar sources.
pub trait RawBarSource: Send + Sync {
    /// Human-readable name, used as the default `source_id` of loaded bars.
    fn name(&self) -> &str;

    /// Load every bar in source order.
    fn load(&self) -> Result<Vec<RawBar>, DataError>;
}

/// Pick a source by file extension.
pub fn source_for_path(path: &Path) -> Result<Box<dyn RawBarSource>, DataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => Ok(Box::new(CsvSource::new(path))),
        Some("json") => Ok(Box::new(JsonSource::new(path))),
        _ => Err(DataError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Load all sources in order and concatenate their bars.
pub fn load_all(sources: &[Box<dyn RawBarSource>]) -> Result<Vec<RawBar>, DataError> {
    let mut bars = Vec::new();
    for source in sources {
        let loaded = source.load()?;
        debug!(source = source.name(), bars = loaded.len(), "loaded raw bars");
        bars.extend(loaded);
    }
    Ok(bars)
}

/// File name of `path`, falling back to the full path.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
