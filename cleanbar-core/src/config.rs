//! Cleaning configuration.
//!
//! A `CleanConfig` value is passed explicitly into every pipeline call; there
//! are no process-wide defaults. It deserializes from TOML with every field
//! optional:
//!
//! ```toml
//! tolerance_ms = 500
//! aggregation_policy = "sum"
//! impute_missing_fields = false
//! reject_non_positive_prices = true
//! window_start = "2024-01-01T00:00:00Z"
//!
//! [seed_bar]
//! timestamp = "2023-12-31T23:59:00Z"
//! open = 10.0
//! high = 10.0
//! low = 10.0
//! close = 10.0
//! volume = 0.0
//! is_synthetic = false
//! ```

use crate::domain::{BarInterval, CanonicalBar};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("tolerance {tolerance_ms}ms must be less than half the interval ({interval})")]
    ToleranceTooWide {
        tolerance_ms: u64,
        interval: BarInterval,
    },

    #[error("window start {start} is after window end {end}")]
    InvertedWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("seed bar at {timestamp} is not a valid bar")]
    InvalidSeed { timestamp: DateTime<Utc> },
}

/// How volume is combined when several raw bars land in one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Total volume of all bars in the slot.
    #[default]
    Sum,
    /// Volume of the latest bar in the slot.
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Max distance (ms) between a raw timestamp and a grid point for it to snap there.
    pub tolerance_ms: u64,

    /// Bar whose close seeds gaps that occur before the first observed bar.
    pub seed_bar: Option<CanonicalBar>,

    pub aggregation_policy: AggregationPolicy,

    /// Let bars with some (not all) OHLC fields missing through to imputation.
    pub impute_missing_fields: bool,

    /// Treat zero or negative prices as invalid.
    pub reject_non_positive_prices: bool,

    /// Explicit grid start; raw bars before it are dropped.
    pub window_start: Option<DateTime<Utc>>,

    /// Explicit grid end; raw bars after it are dropped.
    pub window_end: Option<DateTime<Utc>>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 0,
            seed_bar: None,
            aggregation_policy: AggregationPolicy::Sum,
            impute_missing_fields: false,
            reject_non_positive_prices: true,
            window_start: None,
            window_end: None,
        }
    }
}

impl CleanConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn tolerance(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.tolerance_ms).unwrap_or(i64::MAX))
    }

    pub fn with_tolerance_ms(mut self, tolerance_ms: u64) -> Self {
        self.tolerance_ms = tolerance_ms;
        self
    }

    pub fn with_seed(mut self, seed: CanonicalBar) -> Self {
        self.seed_bar = Some(seed);
        self
    }

    pub fn with_aggregation(mut self, policy: AggregationPolicy) -> Self {
        self.aggregation_policy = policy;
        self
    }

    pub fn with_imputation(mut self, enabled: bool) -> Self {
        self.impute_missing_fields = enabled;
        self
    }

    pub fn with_window(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.window_start = start;
        self.window_end = end;
        self
    }

    /// Check the config against the interval it will be used with.
    pub fn validate(&self, interval: BarInterval) -> Result<(), ConfigError> {
        // Snapping is ambiguous once a timestamp can be in range of two grid points.
        if (self.tolerance_ms as i128) * 2 >= interval.as_millis() as i128 {
            return Err(ConfigError::ToleranceTooWide {
                tolerance_ms: self.tolerance_ms,
                interval,
            });
        }

        if let (Some(start), Some(end)) = (self.window_start, self.window_end) {
            if start > end {
                return Err(ConfigError::InvertedWindow { start, end });
            }
        }

        if let Some(seed) = &self.seed_bar {
            if !seed.is_sane() {
                return Err(ConfigError::InvalidSeed {
                    timestamp: seed.timestamp,
                });
            }
        }

        Ok(())
    }
}
