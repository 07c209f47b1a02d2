//! Bar types: raw observations in, canonical grid bars out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed OHLCV record, exactly as a data source delivered it.
///
/// Every numeric field is optional: `None` is a missing value, while a
/// present-but-NaN/infinite value is kept as-is so the parser can report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    #[serde(default)]
    pub source_id: String,
}

impl RawBar {
    /// Fully populated raw bar.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
            source_id: String::new(),
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// OHLC fields in `[open, high, low, close]` order.
    pub fn prices(&self) -> [Option<f64>; 4] {
        [self.open, self.high, self.low, self.close]
    }

    pub fn missing_price_count(&self) -> usize {
        self.prices().iter().filter(|p| p.is_none()).count()
    }

    /// True when all four prices and the volume are present.
    pub fn is_complete(&self) -> bool {
        self.missing_price_count() == 0 && self.volume.is_some()
    }
}

/// One bar on the canonical grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub is_synthetic: bool,
}

impl CanonicalBar {
    /// Flat bar at `price` with zero volume, used to fill a gap.
    pub fn synthetic(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            is_synthetic: true,
        }
    }

    /// `low <= min(open, close) <= max(open, close) <= high` and `volume >= 0`,
    /// with every field finite.
    pub fn is_sane(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
            && self.volume >= 0.0
    }

    /// Widen high/low so the bar satisfies the ordering invariant.
    ///
    /// Returns `true` if anything changed.
    pub fn clamp_range(&mut self) -> bool {
        let high = self.open.max(self.high).max(self.low).max(self.close);
        let low = self.open.min(self.high).min(self.low).min(self.close);
        let changed = high != self.high || low != self.low;
        self.high = high;
        self.low = low;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> CanonicalBar {
        CanonicalBar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
            is_synthetic: false,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_nan() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(!bar.is_sane());
    }

    #[test]
    fn clamp_widens_range() {
        let mut bar = sample_bar();
        bar.open = 107.0;
        bar.close = 96.0;
        assert!(bar.clamp_range());
        assert_eq!(bar.high, 107.0);
        assert_eq!(bar.low, 96.0);
        assert!(bar.is_sane());
        assert!(!bar.clamp_range());
    }

    #[test]
    fn synthetic_bar_is_flat() {
        let bar = CanonicalBar::synthetic(sample_bar().timestamp, 10.5);
        assert!(bar.is_synthetic);
        assert_eq!(bar.volume, 0.0);
        assert_eq!(bar.open, bar.close);
        assert!(bar.is_sane());
    }

    #[test]
    fn raw_bar_counts_missing_prices() {
        let mut raw = RawBar::new(sample_bar().timestamp, 1.0, 2.0, 0.5, 1.5, 10.0);
        assert!(raw.is_complete());
        raw.close = None;
        raw.low = None;
        assert_eq!(raw.missing_price_count(), 2);
        assert!(!raw.is_complete());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: CanonicalBar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
