//! Run fingerprinting: deterministic identification of a cleaning run.
//!
//! Every component is a BLAKE3 digest over canonical JSON. Struct fields
//! serialize in declaration order and the report is already sorted, so equal
//! values always hash equally.

use crate::config::CleanConfig;
use crate::domain::{BarInterval, ContentHash, RawBar};
use crate::pipeline::CleanOutput;
use serde::{Deserialize, Serialize};

/// Inputs and outputs of one run, each reduced to a content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    /// Symbol, interval and config.
    pub config_hash: ContentHash,
    /// Raw bars in ingestion order.
    pub input_hash: ContentHash,
    pub series_hash: ContentHash,
    pub report_hash: ContentHash,
}

#[derive(Serialize)]
struct RunSettings<'a> {
    symbol: &'a str,
    interval: BarInterval,
    config: &'a CleanConfig,
}

fn hash_json<T: Serialize + ?Sized>(value: &T) -> Result<ContentHash, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    Ok(ContentHash::from_bytes(&json))
}

impl RunFingerprint {
    pub fn compute(
        raw: &[RawBar],
        symbol: &str,
        interval: BarInterval,
        config: &CleanConfig,
        output: &CleanOutput,
    ) -> Result<Self, serde_json::Error> {
        let settings = RunSettings {
            symbol,
            interval,
            config,
        };
        Ok(Self {
            config_hash: hash_json(&settings)?,
            input_hash: hash_json(raw)?,
            series_hash: hash_json(&output.series)?,
            report_hash: hash_json(&output.report)?,
        })
    }

    /// True when both runs produced the same series and report.
    pub fn same_output(&self, other: &Self) -> bool {
        self.series_hash == other.series_hash && self.report_hash == other.report_hash
    }
}
