//! Error types for the cleaning pipeline.

use crate::config::ConfigError;
use crate::domain::{BarInterval, IntervalError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Why a single raw bar was rejected.
///
/// Never fatal: the bar is excluded and the reason lands in the defect report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidValue {
    #[error("{field} is missing")]
    Missing { field: &'static str },

    #[error("all OHLC fields are missing")]
    AllPricesMissing,

    #[error("{field} is not finite ({value})")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} is not positive ({value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("high {high} is below low {low}")]
    InvertedRange { high: f64, low: f64 },

    #[error("volume is negative ({volume})")]
    NegativeVolume { volume: f64 },
}

/// Fatal pipeline failures. A run that returns one of these produced no series.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no valid bars survived validation ({rejected} rejected)")]
    EmptyInput { rejected: usize },

    #[error("gap at {timestamp} has no prior bar to carry forward (configure a seed bar or trim the window)")]
    UnfillableGap { timestamp: DateTime<Utc> },

    #[error("{timestamp} has no grid slot on the {interval} grid within the supported date range")]
    TimestampOutOfRange {
        timestamp: DateTime<Utc>,
        interval: BarInterval,
    },

    #[error("grid integrity violated at bar {index}: {detail}")]
    GridIntegrity { index: usize, detail: String },

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("interval error: {0}")]
    Interval(#[from] IntervalError),
}
