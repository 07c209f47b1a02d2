//! Bar interval and canonical grid arithmetic.
//!
//! The grid is anchored at the Unix epoch: a timestamp is on the grid when its
//! millisecond offset from 1970-01-01T00:00:00Z is a multiple of the interval.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const UNITS: [(&str, i64); 6] = [
    ("w", 7 * 86_400_000),
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("invalid interval '{value}' (expected e.g. 30s, 1m, 5m, 1h, 1d)")]
    Unparseable { value: String },

    #[error("interval must be positive, got {millis}ms")]
    NonPositive { millis: i64 },

    #[error("cannot infer interval from {distinct} distinct timestamp(s), need at least 2")]
    InsufficientTimestamps { distinct: usize },
}

/// Fixed spacing between consecutive canonical bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BarInterval {
    millis: i64,
}

impl BarInterval {
    pub const MINUTE: Self = Self { millis: 60_000 };
    pub const HOUR: Self = Self { millis: 3_600_000 };
    pub const DAY: Self = Self { millis: 86_400_000 };

    pub fn from_millis(millis: i64) -> Result<Self, IntervalError> {
        if millis <= 0 {
            return Err(IntervalError::NonPositive { millis });
        }
        Ok(Self { millis })
    }

    pub fn from_secs(secs: i64) -> Result<Self, IntervalError> {
        Self::from_millis(secs.saturating_mul(1_000))
    }

    pub fn as_millis(self) -> i64 {
        self.millis
    }

    pub fn as_duration(self) -> Duration {
        Duration::milliseconds(self.millis)
    }

    /// Largest grid point at or before `t`.
    ///
    /// `None` when that point lies before the earliest representable instant.
    pub fn floor(self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let millis = t.timestamp_millis();
        DateTime::from_timestamp_millis(millis - millis.rem_euclid(self.millis))
    }

    /// Smallest grid point at or after `t`.
    ///
    /// `None` when that point lies past the latest representable instant.
    pub fn ceil(self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let floored = self.floor(t)?;
        if floored == t {
            Some(t)
        } else {
            floored.checked_add_signed(self.as_duration())
        }
    }

    pub fn is_aligned(self, t: DateTime<Utc>) -> bool {
        t.timestamp_millis().rem_euclid(self.millis) == 0
    }

    /// Grid slot a raw timestamp belongs to.
    ///
    /// Within `tolerance` of a grid point the timestamp snaps to it (either
    /// side); otherwise it falls into the bucket that starts at `floor(t)`.
    /// A next grid point past the representable range is never snapped to.
    /// `None` only when `floor(t)` itself is unrepresentable.
    pub fn slot_of(self, t: DateTime<Utc>, tolerance: Duration) -> Option<DateTime<Utc>> {
        let floor = self.floor(t)?;
        if t - floor <= tolerance {
            return Some(floor);
        }
        match floor.checked_add_signed(self.as_duration()) {
            Some(next) if next - t <= tolerance => Some(next),
            _ => Some(floor),
        }
    }

    /// Infer the interval as the median spacing of the distinct timestamps.
    pub fn infer<I>(timestamps: I) -> Result<Self, IntervalError>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut ts: Vec<i64> = timestamps
            .into_iter()
            .map(|t| t.timestamp_millis())
            .collect();
        ts.sort_unstable();
        ts.dedup();

        if ts.len() < 2 {
            return Err(IntervalError::InsufficientTimestamps { distinct: ts.len() });
        }

        let mut diffs: Vec<i64> = ts.windows(2).map(|w| w[1] - w[0]).collect();
        diffs.sort_unstable();
        let mid = diffs.len() / 2;
        let median = if diffs.len() % 2 == 0 {
            (diffs[mid - 1] + diffs[mid]) / 2
        } else {
            diffs[mid]
        };
        Self::from_millis(median)
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (unit, size) in UNITS {
            if self.millis % size == 0 {
                return write!(f, "{}{}", self.millis / size, unit);
            }
        }
        write!(f, "{}ms", self.millis)
    }
}

impl FromStr for BarInterval {
    type Err = IntervalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().to_ascii_lowercase();
        let unparseable = || IntervalError::Unparseable {
            value: value.to_owned(),
        };

        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);
        let count: i64 = digits.parse().map_err(|_| unparseable())?;

        // A bare number is a count of seconds.
        let size = if unit.is_empty() {
            1_000
        } else {
            UNITS
                .iter()
                .find(|(name, _)| *name == unit)
                .map(|(_, size)| *size)
                .ok_or_else(unparseable)?
        };

        Self::from_millis(count.checked_mul(size).ok_or_else(unparseable)?)
    }
}

impl TryFrom<String> for BarInterval {
    type Error = IntervalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BarInterval> for String {
    fn from(interval: BarInterval) -> Self {
        interval.to_string()
    }
}
