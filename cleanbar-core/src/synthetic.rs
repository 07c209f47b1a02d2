//! Synthetic dirty data for benches, property tests and demos.
//!
//! Produces a seeded random walk on the grid, then damages it: missing bars,
//! replayed duplicates, corrupt records, missing fields, split bars, opens
//! outside the high/low range and timestamp jitter. A given `DirtyDataSpec`
//! always yields the same bars.

use crate::domain::{BarInterval, RawBar};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shape of a generated dirty dataset. Rates are per-bar probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirtyDataSpec {
    /// Grid slots covered, including the ones left empty.
    pub bars: usize,
    pub interval: BarInterval,
    pub start: DateTime<Utc>,
    pub seed: u64,
    pub start_price: f64,
    /// Slot left without any raw bar.
    pub gap_rate: f64,
    /// Stale copy ingested before the real bar.
    pub duplicate_rate: f64,
    /// Extra corrupt record (NaN close, inverted range or negative volume).
    pub invalid_rate: f64,
    /// One field blanked out.
    pub missing_rate: f64,
    /// Bar delivered as two half-interval sub-bars.
    pub split_rate: f64,
    /// Open nudged above the high.
    pub unordered_rate: f64,
    /// Maximum absolute timestamp offset, in milliseconds.
    pub jitter_ms: u64,
}

impl Default for DirtyDataSpec {
    fn default() -> Self {
        Self {
            bars: 1_000,
            interval: BarInterval::MINUTE,
            start: DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default(),
            seed: 42,
            start_price: 100.0,
            gap_rate: 0.02,
            duplicate_rate: 0.02,
            invalid_rate: 0.01,
            missing_rate: 0.01,
            split_rate: 0.02,
            unordered_rate: 0.01,
            jitter_ms: 0,
        }
    }
}

impl DirtyDataSpec {
    /// Same walk, no damage.
    pub fn pristine(bars: usize, interval: BarInterval, seed: u64) -> Self {
        Self {
            bars,
            interval,
            seed,
            gap_rate: 0.0,
            duplicate_rate: 0.0,
            invalid_rate: 0.0,
            missing_rate: 0.0,
            split_rate: 0.0,
            unordered_rate: 0.0,
            jitter_ms: 0,
            ..Self::default()
        }
    }
}

fn chance(rng: &mut StdRng, rate: f64) -> bool {
    rate > 0.0 && rng.gen_bool(rate.min(1.0))
}

/// Generate raw bars in ingestion order.
///
/// The first slot is always a clean bar, so cleaning never needs a seed bar.
pub fn generate_dirty_bars(spec: &DirtyDataSpec) -> Vec<RawBar> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let step = spec.interval.as_millis();
    let jitter = spec.jitter_ms as i64;
    let start = spec.interval.floor(spec.start).unwrap_or(spec.start);

    let mut out = Vec::with_capacity(spec.bars + spec.bars / 8);
    let mut price = spec.start_price;

    for i in 0..spec.bars {
        // stop at the end of the representable date range
        let offset_from_start = Duration::milliseconds(step.saturating_mul(i as i64));
        let Some(slot) = start.checked_add_signed(offset_from_start) else {
            break;
        };
        let open = price;
        let close = price * (1.0 + rng.gen_range(-0.01..0.01));
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        let volume = rng.gen_range(1.0..1_000.0_f64).round();
        price = close;

        let offset = if jitter > 0 {
            rng.gen_range(-jitter..=jitter)
        } else {
            0
        };
        let ts = slot
            .checked_add_signed(Duration::milliseconds(offset))
            .unwrap_or(slot);
        let mut bar = RawBar::new(ts, open, high, low, close, volume).with_source("synthetic");

        if i == 0 {
            out.push(bar);
            continue;
        }
        if chance(&mut rng, spec.gap_rate) {
            continue;
        }

        if chance(&mut rng, spec.invalid_rate) {
            let mut corrupt = bar.clone().with_source("corrupt");
            match rng.gen_range(0..3) {
                0 => corrupt.close = Some(f64::NAN),
                1 => {
                    corrupt.high = Some(low * 0.9);
                    corrupt.low = Some(high * 1.1);
                }
                _ => corrupt.volume = Some(-volume),
            }
            out.push(corrupt);
        }

        if chance(&mut rng, spec.duplicate_rate) {
            let mut stale = bar.clone().with_source("replay");
            stale.close = Some(close * 0.999);
            stale.low = Some(low.min(close * 0.999));
            out.push(stale);
        }

        if chance(&mut rng, spec.unordered_rate) {
            bar.open = Some(high * 1.002);
        }

        if chance(&mut rng, spec.missing_rate) {
            match rng.gen_range(0..5) {
                0 => bar.open = None,
                1 => bar.high = None,
                2 => bar.low = None,
                3 => bar.close = None,
                _ => bar.volume = None,
            }
        }

        if step >= 2 && chance(&mut rng, spec.split_rate) && bar.is_complete() {
            let mid = (open + close) / 2.0;
            let half_volume = (volume / 2.0).floor();
            let first = RawBar::new(ts, open, high.max(open), low.min(mid), mid, half_volume)
                .with_source("split");
            let second = RawBar::new(
                slot.checked_add_signed(Duration::milliseconds(step / 2))
                    .unwrap_or(ts),
                mid,
                high.max(mid),
                low.min(mid),
                close,
                volume - half_volume,
            )
            .with_source("split");
            out.push(first);
            out.push(second);
            continue;
        }

        out.push(bar);
    }
    out
}
