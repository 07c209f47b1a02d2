//! Domain types for cleanbar

pub mod bar;
pub mod defect;
pub mod ids;
pub mod interval;
pub mod series;

pub use bar::{CanonicalBar, RawBar};
pub use defect::{Defect, DefectKind, DefectReport, Resolution};
pub use ids::{normalize_symbol, ContentHash};
pub use interval::{BarInterval, IntervalError};
pub use series::Series;

/// Symbol type alias
pub type Symbol = String;
