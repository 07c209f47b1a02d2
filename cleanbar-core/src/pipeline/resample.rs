//! Stage 2: place parsed bars on the canonical grid.
//!
//! Each grid slot ends up with exactly one bar:
//! - one raw bar in the slot → copied over
//! - several raw bars → merged (open first, close last, high max, low min)
//! - none → synthetic flat bar at the previous close, zero volume
//!
//! Missing fields (only present when imputation is enabled, or for volume) are
//! filled from the nearest earlier observation of the same field.

use super::parse::Parsed;
use crate::config::{AggregationPolicy, CleanConfig};
use crate::domain::{BarInterval, CanonicalBar, Defect, DefectKind, RawBar, Resolution};
use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Output of the resample stage: one bar per grid slot, plus every defect so far.
#[derive(Debug, Clone)]
pub struct Resampled {
    pub(crate) bars: Vec<CanonicalBar>,
    pub(crate) defects: Vec<Defect>,
}

impl Resampled {
    pub fn bars(&self) -> &[CanonicalBar] {
        &self.bars
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }
}

/// A raw bar with every field resolved, tagged with its grid slot.
#[derive(Debug, Clone, Copy)]
struct Observation {
    slot: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Most recent valid value per field, in `[open, high, low, close, volume]` order.
#[derive(Debug, Default)]
struct LastSeen([Option<f64>; 5]);

impl LastSeen {
    const NAMES: [&'static str; 5] = ["open", "high", "low", "close", "volume"];

    fn seeded(seed: Option<&CanonicalBar>) -> Self {
        match seed {
            Some(s) => Self([
                Some(s.open),
                Some(s.high),
                Some(s.low),
                Some(s.close),
                Some(s.volume),
            ]),
            None => Self::default(),
        }
    }

    /// Resolve every field of `bar`, remembering present values for later bars.
    ///
    /// Returns the resolved fields and the names of the ones that were imputed.
    fn resolve(&mut self, bar: &RawBar) -> ([f64; 5], Vec<&'static str>) {
        let fields = [bar.open, bar.high, bar.low, bar.close, bar.volume];
        // own-bar fallback when no earlier value exists: close, open, high, low
        let own_price = bar.close.or(bar.open).or(bar.high).or(bar.low);

        let mut resolved = [0.0; 5];
        let mut imputed = Vec::new();
        for (i, field) in fields.iter().enumerate() {
            match field {
                Some(v) => {
                    resolved[i] = *v;
                    self.0[i] = Some(*v);
                }
                None => {
                    let fallback = if i == 4 { Some(0.0) } else { own_price };
                    resolved[i] = self.0[i].or(fallback).unwrap_or(0.0);
                    imputed.push(Self::NAMES[i]);
                }
            }
        }
        (resolved, imputed)
    }
}

/// Resample parsed bars onto the grid for `interval`.
pub fn resample(
    parsed: Parsed,
    interval: BarInterval,
    config: &CleanConfig,
) -> Result<Resampled, PipelineError> {
    let Parsed { bars, mut defects } = parsed;
    let tolerance = config.tolerance();
    let grid_floor = |t: DateTime<Utc>| {
        interval
            .floor(t)
            .ok_or(PipelineError::TimestampOutOfRange { timestamp: t, interval })
    };
    let window_start = config.window_start.map(grid_floor).transpose()?;
    let window_end = config.window_end.map(grid_floor).transpose()?;

    let mut last_seen = LastSeen::seeded(config.seed_bar.as_ref());
    let mut observations: Vec<Observation> = Vec::with_capacity(bars.len());
    let mut out_of_window = 0usize;

    for bar in &bars {
        let slot = interval.slot_of(bar.timestamp, tolerance).ok_or(
            PipelineError::TimestampOutOfRange {
                timestamp: bar.timestamp,
                interval,
            },
        )?;
        let (fields, imputed) = last_seen.resolve(bar);

        let before = window_start.is_some_and(|start| slot < start);
        let after = window_end.is_some_and(|end| slot > end);
        if before || after {
            out_of_window += 1;
            defects.push(Defect::new(
                bar.timestamp,
                DefectKind::OutOfWindow,
                Resolution::Excluded,
                format!(
                    "slot {} outside requested window",
                    slot.to_rfc3339()
                ),
            ));
            continue;
        }

        if !imputed.is_empty() {
            defects.push(Defect::new(
                bar.timestamp,
                DefectKind::FieldImputed,
                Resolution::CarriedForwardField,
                format!("filled missing {}", imputed.join(", ")),
            ));
        }

        let [open, high, low, close, volume] = fields;
        observations.push(Observation {
            slot,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
        return Err(PipelineError::EmptyInput {
            rejected: out_of_window,
        });
    };

    // Without a window the grid spans exactly the occupied slots: the first
    // slot is floor(first) unless the first bar snapped up to the next point.
    let grid_start = window_start.unwrap_or(first.slot);
    let grid_end = window_end.unwrap_or(last.slot);

    let step = interval.as_duration();
    let mut out: Vec<CanonicalBar> = Vec::new();
    let mut pending = observations.iter().peekable();
    let mut slot = grid_start;
    let mut gaps = 0usize;
    let mut merged = 0usize;

    while slot <= grid_end {
        let mut in_slot: Vec<&Observation> = Vec::new();
        while let Some(obs) = pending.next_if(|o| o.slot == slot) {
            in_slot.push(obs);
        }

        let bar = match in_slot.as_slice() {
            [] => {
                let prior_close = out
                    .last()
                    .map(|b| b.close)
                    .or_else(|| config.seed_bar.map(|s| s.close));
                let Some(price) = prior_close else {
                    return Err(PipelineError::UnfillableGap { timestamp: slot });
                };
                gaps += 1;
                defects.push(Defect::new(
                    slot,
                    DefectKind::GapFilled,
                    Resolution::CarriedForwardClose,
                    format!("no raw bar; carried close {price}"),
                ));
                CanonicalBar::synthetic(slot, price)
            }
            [only] => CanonicalBar {
                timestamp: slot,
                open: only.open,
                high: only.high,
                low: only.low,
                close: only.close,
                volume: only.volume,
                is_synthetic: false,
            },
            many => {
                merged += 1;
                let (bar, saturated) = aggregate(slot, many, config.aggregation_policy);
                let detail = if saturated {
                    format!("merged {} raw bars; volume sum saturated at f64::MAX", many.len())
                } else {
                    format!("merged {} raw bars", many.len())
                };
                defects.push(Defect::new(
                    slot,
                    DefectKind::Aggregated,
                    Resolution::Merged,
                    detail,
                ));
                bar
            }
        };
        out.push(bar);
        // the grid ends at or before the last representable instant
        match slot.checked_add_signed(step) {
            Some(next) => slot = next,
            None => break,
        }
    }

    debug!(
        slots = out.len(),
        gaps,
        merged,
        out_of_window,
        "resample stage complete"
    );

    Ok(Resampled { bars: out, defects })
}

/// Merge the observations of one slot. The flag is set when summed volume
/// overflowed and was capped at `f64::MAX`.
fn aggregate(
    slot: DateTime<Utc>,
    observations: &[&Observation],
    policy: AggregationPolicy,
) -> (CanonicalBar, bool) {
    let first = observations[0];
    let last = observations[observations.len() - 1];
    let (volume, saturated) = match policy {
        AggregationPolicy::Sum => {
            let total: f64 = observations.iter().map(|o| o.volume).sum();
            if total.is_finite() {
                (total, false)
            } else {
                (f64::MAX, true)
            }
        }
        AggregationPolicy::Last => (last.volume, false),
    };

    let bar = CanonicalBar {
        timestamp: slot,
        open: first.open,
        high: observations
            .iter()
            .map(|o| o.high)
            .fold(f64::NEG_INFINITY, f64::max),
        low: observations
            .iter()
            .map(|o| o.low)
            .fold(f64::INFINITY, f64::min),
        close: last.close,
        volume,
        is_synthetic: false,
    };
    (bar, saturated)
}
