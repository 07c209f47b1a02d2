//! CSV source: one bar per row under a `timestamp,open,high,low,close,volume` header.

use super::{display_name, parse_timestamp, DataError, RawBarSource};
use crate::domain::RawBar;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Row as it appears in the file. Empty or non-numeric cells read as missing.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "datetime", alias = "date")]
    timestamp: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
    #[serde(default)]
    source_id: Option<String>,
}

/// Raw bars from a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    name: String,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = display_name(&path);
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse CSV text already in memory. `path` is only used in errors.
    pub fn parse_reader<R: Read>(
        reader: R,
        path: &Path,
        default_source: &str,
    ) -> Result<Vec<RawBar>, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let csv_err = |source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let headers = rdr.headers().map_err(csv_err)?.clone();
        let mut bars = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            let line = record.position().map_or(0, |p| p.line());
            let row: CsvRow = record.deserialize(Some(&headers)).map_err(csv_err)?;

            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| DataError::Parse {
                path: path.to_path_buf(),
                line,
                reason: format!("unparseable timestamp '{}'", row.timestamp),
            })?;

            let source_id = row
                .source_id
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default_source.to_string());

            bars.push(RawBar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                source_id,
            });
        }
        Ok(bars)
    }
}

impl RawBarSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<RawBar>, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|source| DataError::Io {
            path: self.path.clone(),
            source,
        })?;
        Self::parse_reader(file, &self.path, &self.name)
    }
}
