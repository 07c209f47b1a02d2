//! JSON source: an array of bar records.

use super::timestamp::{from_epoch, from_epoch_f64};
use super::{display_name, parse_timestamp, DataError, RawBarSource};
use crate::domain::RawBar;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct JsonRecord {
    #[serde(alias = "datetime", alias = "date")]
    timestamp: Value,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    source_id: Option<String>,
}

fn timestamp_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => match n.as_i64() {
            Some(epoch) => from_epoch(epoch),
            None => n.as_f64().and_then(from_epoch_f64),
        },
        _ => None,
    }
}

/// Raw bars from a JSON file holding an array of records.
///
/// Fields match the CSV columns; `null` or absent fields are missing values.
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
    name: String,
}

impl JsonSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = display_name(&path);
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse JSON text already in memory. `path` is only used in errors.
    pub fn parse_str(
        content: &str,
        path: &Path,
        default_source: &str,
    ) -> Result<Vec<RawBar>, DataError> {
        let records: Vec<JsonRecord> =
            serde_json::from_str(content).map_err(|source| DataError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        records
            .into_iter()
            .enumerate()
            .map(|(i, rec)| {
                let timestamp = timestamp_of(&rec.timestamp).ok_or_else(|| DataError::Parse {
                    path: path.to_path_buf(),
                    line: i as u64 + 1,
                    reason: format!("unparseable timestamp {}", rec.timestamp),
                })?;
                Ok(RawBar {
                    timestamp,
                    open: rec.open,
                    high: rec.high,
                    low: rec.low,
                    close: rec.close,
                    volume: rec.volume,
                    source_id: rec
                        .source_id
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| default_source.to_string()),
                })
            })
            .collect()
    }
}

impl RawBarSource for JsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<RawBar>, DataError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| DataError::Io {
            path: self.path.clone(),
            source,
        })?;
        Self::parse_str(&content, &self.path, &self.name)
    }
}
