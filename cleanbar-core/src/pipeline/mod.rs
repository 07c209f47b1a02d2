//! The cleaning pipeline.
//!
//! A run moves through `Raw → Parsed → Resampled → Normalized`. Each stage
//! consumes the previous stage's output type, so stages cannot be skipped or
//! re-entered, and a failure anywhere returns an error with no partial series.
//!
//! The pipeline is pure: no I/O, no shared state. Independent runs may execute
//! on different threads; `clean_many` does exactly that.

pub mod normalize;
pub mod parse;
pub mod resample;

pub use normalize::{normalize, verify_grid};
pub use parse::{parse, validate_bar, Parsed};
pub use resample::{resample, Resampled};

use crate::config::CleanConfig;
use crate::domain::{BarInterval, DefectReport, RawBar, Series, Symbol};
use crate::error::PipelineError;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, info_span};

/// A finished run: the series and the report explaining how it was built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanOutput {
    pub series: Series,
    pub report: DefectReport,
}

/// Clean `raw` into a gap-free series for `symbol` at `interval`.
///
/// `raw` is read in ingestion order; for duplicate timestamps the later
/// record wins.
pub fn clean(
    raw: &[RawBar],
    symbol: &str,
    interval: BarInterval,
    config: &CleanConfig,
) -> Result<CleanOutput, PipelineError> {
    let span = info_span!("clean", symbol, %interval);
    let _guard = span.enter();

    config.validate(interval)?;

    let parsed = parse(raw, config)?;
    let resampled = resample(parsed, interval, config)?;
    let output = normalize(resampled, symbol, interval)?;

    info!(
        raw = raw.len(),
        bars = output.series.len(),
        synthetic = output.series.synthetic_count(),
        defects = output.report.len(),
        "cleaned series"
    );
    Ok(output)
}

/// Median spacing of the raw timestamps, for callers that don't know the interval.
pub fn infer_interval(raw: &[RawBar]) -> Result<BarInterval, PipelineError> {
    Ok(BarInterval::infer(raw.iter().map(|b| b.timestamp))?)
}

/// One independent cleaning request.
#[derive(Debug, Clone)]
pub struct CleanJob {
    pub symbol: Symbol,
    pub interval: BarInterval,
    pub raw: Vec<RawBar>,
    pub config: CleanConfig,
}

/// Run independent jobs in parallel. Results come back in job order.
pub fn clean_many(jobs: &[CleanJob]) -> Vec<(Symbol, Result<CleanOutput, PipelineError>)> {
    jobs.par_iter()
        .map(|job| {
            let result = clean(&job.raw, &job.symbol, job.interval, &job.config);
            (job.symbol.clone(), result)
        })
        .collect()
}
