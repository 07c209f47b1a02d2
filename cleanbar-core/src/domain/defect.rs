//! Defect report: the audit trail of every repair a cleaning run made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What was wrong with the data at a given timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    InvalidValues,
    DuplicateTimestamp,
    OutOfWindow,
    Aggregated,
    GapFilled,
    FieldImputed,
    OrderingClamped,
}

impl DefectKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidValues => "invalid_values",
            Self::DuplicateTimestamp => "duplicate_timestamp",
            Self::OutOfWindow => "out_of_window",
            Self::Aggregated => "aggregated",
            Self::GapFilled => "gap_filled",
            Self::FieldImputed => "field_imputed",
            Self::OrderingClamped => "ordering_clamped",
        }
    }
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the defect was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The raw bar was dropped.
    Excluded,
    /// An earlier record with the same timestamp was dropped in favour of a later one.
    DiscardedOlder,
    /// Several raw bars were merged into one grid bar.
    Merged,
    /// A synthetic bar was built from the previous close.
    CarriedForwardClose,
    /// Missing fields were taken from earlier observations.
    CarriedForwardField,
    /// High/low were widened to contain open and close.
    Clamped,
}

impl Resolution {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excluded => "excluded",
            Self::DiscardedOlder => "discarded_older",
            Self::Merged => "merged",
            Self::CarriedForwardClose => "carried_forward_close",
            Self::CarriedForwardField => "carried_forward_field",
            Self::Clamped => "clamped",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single anomaly and its resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    pub timestamp: DateTime<Utc>,
    pub kind: DefectKind,
    pub resolution: Resolution,
    pub detail: String,
}

impl Defect {
    pub fn new(
        timestamp: DateTime<Utc>,
        kind: DefectKind,
        resolution: Resolution,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            kind,
            resolution,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}): {}",
            self.timestamp.to_rfc3339(),
            self.kind,
            self.resolution,
            self.detail
        )
    }
}

/// All defects found in one cleaning run, ordered by timestamp.
///
/// Entries sharing a timestamp keep the order in which the pipeline stages
/// recorded them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectReport {
    entries: Vec<Defect>,
}

impl DefectReport {
    /// Build a report from stage fragments, sorting them stably by timestamp.
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = Vec<Defect>>,
    {
        let mut entries: Vec<Defect> = fragments.into_iter().flatten().collect();
        entries.sort_by_key(|d| d.timestamp);
        Self { entries }
    }

    pub fn entries(&self) -> &[Defect] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DefectKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn of_kind(&self, kind: DefectKind) -> impl Iterator<Item = &Defect> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    /// Per-kind counts, in `DefectKind` order.
    pub fn summary(&self) -> BTreeMap<DefectKind, usize> {
        let mut counts = BTreeMap::new();
        for defect in &self.entries {
            *counts.entry(defect.kind).or_insert(0) += 1;
        }
        counts
    }

    /// One human-readable line per entry.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|d| d.to_string()).collect()
    }
}
