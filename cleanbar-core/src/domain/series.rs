//! Series: the immutable output of a cleaning run.

use super::bar::CanonicalBar;
use super::interval::BarInterval;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Ordered, gap-free canonical bars for one symbol at one interval.
///
/// Only the normalizer constructs a `Series`; there is no mutable access to
/// the bars once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    symbol: String,
    interval: BarInterval,
    bars: Vec<CanonicalBar>,
}

impl Series {
    pub(crate) fn new(symbol: String, interval: BarInterval, bars: Vec<CanonicalBar>) -> Self {
        Self {
            symbol,
            interval,
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> BarInterval {
        self.interval
    }

    pub fn bars(&self) -> &[CanonicalBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.timestamp)
    }

    pub fn synthetic_count(&self) -> usize {
        self.bars.iter().filter(|b| b.is_synthetic).count()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Hand the bars to a consumer that needs ownership.
    pub fn into_bars(self) -> Vec<CanonicalBar> {
        self.bars
    }
}
