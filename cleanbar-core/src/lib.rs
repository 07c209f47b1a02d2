//! cleanbar core: OHLCV cleaning and normalization.
//!
//! Turns raw, possibly dirty bar records into a gap-free, time-ordered series
//! on a fixed interval grid, plus a defect report accounting for every
//! correction:
//! - Parse/validate: reject malformed bars, drop duplicate timestamps, sort
//! - Resample: snap to the grid, merge multi-bar slots, fill gaps
//! - Normalize: enforce OHLC ordering, verify the grid, seal the series
//!
//! Adapters for CSV/JSON files, run fingerprints and a synthetic dirty-data
//! generator sit around the pipeline; the pipeline itself does no I/O.

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod synthetic;

pub use config::{AggregationPolicy, CleanConfig, ConfigError};
pub use domain::{
    BarInterval, CanonicalBar, Defect, DefectKind, DefectReport, RawBar, Resolution, Series,
};
pub use error::{InvalidValue, PipelineError};
pub use pipeline::{clean, clean_many, infer_interval, CleanJob, CleanOutput};
