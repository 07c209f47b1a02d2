//! Stage 3: enforce bar invariants and seal the series.

use super::resample::Resampled;
use super::CleanOutput;
use crate::domain::{
    BarInterval, CanonicalBar, Defect, DefectKind, DefectReport, Resolution, Series,
};
use crate::error::PipelineError;
use tracing::debug;

/// Clamp every bar into OHLC order, verify the grid and build the `Series`.
///
/// A grid that is not strictly increasing with constant `interval` spacing is
/// a bug in the resampler, never a data problem, and fails the run.
pub fn normalize(
    resampled: Resampled,
    symbol: &str,
    interval: BarInterval,
) -> Result<CleanOutput, PipelineError> {
    let Resampled {
        mut bars,
        mut defects,
    } = resampled;

    let mut clamped = 0usize;
    for bar in &mut bars {
        let before = (bar.high, bar.low);
        if bar.clamp_range() {
            clamped += 1;
            defects.push(Defect::new(
                bar.timestamp,
                DefectKind::OrderingClamped,
                Resolution::Clamped,
                format!(
                    "high/low {}/{} widened to {}/{}",
                    before.0, before.1, bar.high, bar.low
                ),
            ));
        }
    }

    verify_grid(&bars, interval)?;

    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(PipelineError::GridIntegrity {
                index,
                detail: format!("bar at {} violates OHLCV invariants", bar.timestamp),
            });
        }
    }

    debug!(bars = bars.len(), clamped, "normalize stage complete");

    Ok(CleanOutput {
        series: Series::new(symbol.to_owned(), interval, bars),
        report: DefectReport::from_fragments([defects]),
    })
}

/// Check grid-aligned, strictly increasing, evenly spaced timestamps.
pub fn verify_grid(bars: &[CanonicalBar], interval: BarInterval) -> Result<(), PipelineError> {
    if let Some(first) = bars.first() {
        if !interval.is_aligned(first.timestamp) {
            return Err(PipelineError::GridIntegrity {
                index: 0,
                detail: format!("{} is not on the {} grid", first.timestamp, interval),
            });
        }
    }

    let step = interval.as_duration();
    for (i, pair) in bars.windows(2).enumerate() {
        let spacing = pair[1].timestamp - pair[0].timestamp;
        if spacing != step {
            return Err(PipelineError::GridIntegrity {
                index: i + 1,
                detail: format!(
                    "spacing {}ms between {} and {}, expected {}",
                    spacing.num_milliseconds(),
                    pair[0].timestamp,
                    pair[1].timestamp,
                    interval
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn minute() -> BarInterval {
        BarInterval::from_secs(60).unwrap()
    }

    fn canonical(secs: i64, open: f64, high: f64, low: f64, close: f64) -> CanonicalBar {
        CanonicalBar {
            timestamp: at(secs),
            open,
            high,
            low,
            close,
            volume: 1.0,
            is_synthetic: false,
        }
    }

    #[test]
    fn clamps_out_of_order_bar() {
        let resampled = Resampled {
            bars: vec![canonical(0, 10.0, 9.5, 9.0, 10.2)],
            defects: Vec::new(),
        };
        let out = normalize(resampled, "BTC-USD", minute()).unwrap();

        let bar = out.series.bars()[0];
        assert_eq!(bar.high, 10.2);
        assert_eq!(bar.low, 9.0);
        assert_eq!(out.report.len(), 1);
        assert_eq!(out.report.entries()[0].kind, DefectKind::OrderingClamped);
    }

    #[test]
    fn uneven_spacing_is_grid_integrity_error() {
        let resampled = Resampled {
            bars: vec![
                canonical(0, 10.0, 11.0, 9.0, 10.0),
                canonical(60, 10.0, 11.0, 9.0, 10.0),
                canonical(180, 10.0, 11.0, 9.0, 10.0),
            ],
            defects: Vec::new(),
        };
        let err = normalize(resampled, "BTC-USD", minute()).unwrap_err();
        assert!(matches!(err, PipelineError::GridIntegrity { index: 2, .. }));
    }

    #[test]
    fn duplicate_timestamp_is_grid_integrity_error() {
        let bars = vec![
            canonical(0, 10.0, 11.0, 9.0, 10.0),
            canonical(0, 10.0, 11.0, 9.0, 10.0),
        ];
        assert!(matches!(
            verify_grid(&bars, minute()),
            Err(PipelineError::GridIntegrity { index: 1, .. })
        ));
    }

    #[test]
    fn negative_volume_is_grid_integrity_error() {
        let mut bar = canonical(0, 10.0, 11.0, 9.0, 10.0);
        bar.volume = -1.0;
        let resampled = Resampled {
            bars: vec![bar],
            defects: Vec::new(),
        };
        assert!(matches!(
            normalize(resampled, "BTC-USD", minute()),
            Err(PipelineError::GridIntegrity { index: 0, .. })
        ));
    }
}
