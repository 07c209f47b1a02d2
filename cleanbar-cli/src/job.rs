//! TOML job files.
//!
//! ```toml
//! symbol = "btc"
//! interval = "1m"          # or "auto"
//! inputs = ["binance.csv", "backfill.json"]
//!
//! [clean]
//! tolerance_ms = 500
//! aggregation_policy = "last"
//! ```
//!
//! Relative input paths resolve against the job file's directory.

use anyhow::{bail, Context, Result};
use cleanbar_core::{BarInterval, CleanConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Requested interval: fixed, or inferred from the loaded timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalArg {
    Auto,
    Fixed(BarInterval),
}

impl FromStr for IntervalArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse::<BarInterval>()
            .map(Self::Fixed)
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    pub symbol: Option<String>,
    pub interval: Option<String>,
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub clean: CleanConfig,
}

impl JobFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job file {}", path.display()))?;
        let mut job = Self::from_toml(&content)
            .with_context(|| format!("invalid job file {}", path.display()))?;

        if let Some(dir) = path.parent() {
            job.inputs = job
                .inputs
                .into_iter()
                .map(|p| if p.is_relative() { dir.join(p) } else { p })
                .collect();
        }
        Ok(job)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn interval(&self) -> Result<Option<IntervalArg>> {
        match &self.interval {
            None => Ok(None),
            Some(text) => match text.parse::<IntervalArg>() {
                Ok(arg) => Ok(Some(arg)),
                Err(e) => bail!("job file interval: {e}"),
            },
        }
    }
}
