//! Stage 1: validate raw bars, drop duplicates, sort.

use crate::config::CleanConfig;
use crate::domain::{Defect, DefectKind, RawBar, Resolution};
use crate::error::{InvalidValue, PipelineError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};

const PRICE_FIELDS: [&str; 4] = ["open", "high", "low", "close"];

/// Output of the parse stage: valid, unique, time-ordered raw bars.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub(crate) bars: Vec<RawBar>,
    pub(crate) defects: Vec<Defect>,
}

impl Parsed {
    pub fn bars(&self) -> &[RawBar] {
        &self.bars
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }
}

/// Check one raw bar against the validation rules.
pub fn validate_bar(bar: &RawBar, config: &CleanConfig) -> Result<(), InvalidValue> {
    let prices = bar.prices();

    if config.impute_missing_fields {
        if prices.iter().all(Option::is_none) {
            return Err(InvalidValue::AllPricesMissing);
        }
    } else if let Some(i) = prices.iter().position(Option::is_none) {
        return Err(InvalidValue::Missing {
            field: PRICE_FIELDS[i],
        });
    }

    for (field, value) in PRICE_FIELDS.into_iter().zip(prices) {
        let Some(value) = value else { continue };
        if !value.is_finite() {
            return Err(InvalidValue::NonFinite { field, value });
        }
        if config.reject_non_positive_prices && value <= 0.0 {
            return Err(InvalidValue::NonPositive { field, value });
        }
    }

    if let (Some(high), Some(low)) = (bar.high, bar.low) {
        if high < low {
            return Err(InvalidValue::InvertedRange { high, low });
        }
    }

    if let Some(volume) = bar.volume {
        if !volume.is_finite() {
            return Err(InvalidValue::NonFinite {
                field: "volume",
                value: volume,
            });
        }
        if volume < 0.0 {
            return Err(InvalidValue::NegativeVolume { volume });
        }
    }

    Ok(())
}

/// Validate, de-duplicate (last write wins) and sort raw bars.
///
/// Input order is the ingestion order. Validation runs first, so an invalid
/// late record never displaces a valid earlier one.
pub fn parse(raw: &[RawBar], config: &CleanConfig) -> Result<Parsed, PipelineError> {
    let mut defects = Vec::new();
    let mut valid: Vec<&RawBar> = Vec::with_capacity(raw.len());

    for bar in raw {
        match validate_bar(bar, config) {
            Ok(()) => valid.push(bar),
            Err(reason) => {
                debug!(timestamp = %bar.timestamp, source = %bar.source_id, %reason, "rejected raw bar");
                defects.push(Defect::new(
                    bar.timestamp,
                    DefectKind::InvalidValues,
                    Resolution::Excluded,
                    reason.to_string(),
                ));
            }
        }
    }
    let rejected = defects.len();

    // timestamp -> index into `valid` of the latest record seen so far
    let mut latest: HashMap<DateTime<Utc>, usize> = HashMap::with_capacity(valid.len());
    for (i, bar) in valid.iter().enumerate() {
        if let Some(older) = latest.insert(bar.timestamp, i) {
            let older = valid[older];
            defects.push(Defect::new(
                bar.timestamp,
                DefectKind::DuplicateTimestamp,
                Resolution::DiscardedOlder,
                format!(
                    "record from '{}' superseded by later record from '{}'",
                    older.source_id, bar.source_id
                ),
            ));
        }
    }

    let mut bars: Vec<RawBar> = valid
        .iter()
        .enumerate()
        .filter(|(i, bar)| latest.get(&bar.timestamp) == Some(i))
        .map(|(_, bar)| (*bar).clone())
        .collect();
    bars.sort_by_key(|b| b.timestamp);

    if bars.is_empty() {
        warn!(rejected, "every raw bar failed validation");
        return Err(PipelineError::EmptyInput { rejected });
    }
    if rejected > 0 {
        warn!(rejected, kept = bars.len(), "excluded invalid raw bars");
    }
    debug!(
        input = raw.len(),
        kept = bars.len(),
        duplicates = defects.len() - rejected,
        "parse stage complete"
    );

    Ok(Parsed { bars, defects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn bar(secs: i64, close: f64) -> RawBar {
        RawBar::new(at(secs), close, close + 1.0, close - 1.0, close, 100.0)
    }

    #[test]
    fn rejects_inverted_range() {
        let mut inverted = bar(0, 7.0);
        inverted.high = Some(5.0);
        inverted.low = Some(9.0);
        let err = validate_bar(&inverted, &CleanConfig::default()).unwrap_err();
        assert_eq!(err, InvalidValue::InvertedRange { high: 5.0, low: 9.0 });
    }

    #[test]
    fn rejects_missing_and_non_finite_fields() {
        let config = CleanConfig::default();

        let mut missing = bar(0, 10.0);
        missing.close = None;
        assert_eq!(
            validate_bar(&missing, &config),
            Err(InvalidValue::Missing { field: "close" })
        );

        let mut infinite = bar(0, 10.0);
        infinite.open = Some(f64::INFINITY);
        assert!(matches!(
            validate_bar(&infinite, &config),
            Err(InvalidValue::NonFinite { field: "open", .. })
        ));

        let mut nan_volume = bar(0, 10.0);
        nan_volume.volume = Some(f64::NAN);
        assert!(matches!(
            validate_bar(&nan_volume, &config),
            Err(InvalidValue::NonFinite { field: "volume", .. })
        ));
    }

    #[test]
    fn rejects_negative_volume_but_not_missing_volume() {
        let config = CleanConfig::default();

        let mut negative = bar(0, 10.0);
        negative.volume = Some(-1.0);
        assert_eq!(
            validate_bar(&negative, &config),
            Err(InvalidValue::NegativeVolume { volume: -1.0 })
        );

        let mut missing = bar(0, 10.0);
        missing.volume = None;
        assert!(validate_bar(&missing, &config).is_ok());
    }

    #[test]
    fn non_positive_prices_are_configurable() {
        let zero = RawBar::new(at(0), 0.0, 1.0, 0.0, 0.5, 10.0);
        assert!(matches!(
            validate_bar(&zero, &CleanConfig::default()),
            Err(InvalidValue::NonPositive { field: "open", .. })
        ));

        let lenient = CleanConfig {
            reject_non_positive_prices: false,
            ..CleanConfig::default()
        };
        assert!(validate_bar(&zero, &lenient).is_ok());
    }

    #[test]
    fn imputation_mode_admits_partial_bars_only() {
        let config = CleanConfig::default().with_imputation(true);

        let mut partial = bar(0, 10.0);
        partial.close = None;
        assert!(validate_bar(&partial, &config).is_ok());

        let empty = RawBar {
            open: None,
            high: None,
            low: None,
            close: None,
            ..bar(0, 10.0)
        };
        assert_eq!(
            validate_bar(&empty, &config),
            Err(InvalidValue::AllPricesMissing)
        );
    }

    #[test]
    fn duplicates_keep_latest_ingested() {
        let raw = vec![
            bar(60, 10.0).with_source("a"),
            bar(0, 9.0),
            bar(60, 11.0).with_source("b"),
        ];

        let parsed = parse(&raw, &CleanConfig::default()).unwrap();
        assert_eq!(parsed.bars().len(), 2);
        assert_eq!(parsed.bars()[0].timestamp, at(0));
        assert_eq!(parsed.bars()[1].close, Some(11.0));
        assert_eq!(parsed.bars()[1].source_id, "b");

        assert_eq!(parsed.defects().len(), 1);
        assert_eq!(parsed.defects()[0].kind, DefectKind::DuplicateTimestamp);
        assert_eq!(parsed.defects()[0].resolution, Resolution::DiscardedOlder);
    }

    #[test]
    fn invalid_late_duplicate_does_not_displace_valid_record() {
        let mut broken = bar(0, 12.0);
        broken.high = Some(1.0);
        let raw = vec![bar(0, 10.0), broken];

        let parsed = parse(&raw, &CleanConfig::default()).unwrap();
        assert_eq!(parsed.bars().len(), 1);
        assert_eq!(parsed.bars()[0].close, Some(10.0));
        assert_eq!(parsed.defects().len(), 1);
        assert_eq!(parsed.defects()[0].kind, DefectKind::InvalidValues);
    }

    #[test]
    fn sorts_by_timestamp() {
        let raw = vec![bar(180, 1.0), bar(0, 2.0), bar(60, 3.0)];
        let parsed = parse(&raw, &CleanConfig::default()).unwrap();
        let ts: Vec<_> = parsed.bars().iter().map(|b| b.timestamp).collect();
        assert_eq!(ts, vec![at(0), at(60), at(180)]);
    }

    #[test]
    fn all_invalid_is_empty_input() {
        let mut a = bar(0, 10.0);
        a.close = Some(f64::NAN);
        let mut b = bar(60, 10.0);
        b.volume = Some(-5.0);

        let err = parse(&[a, b], &CleanConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput { rejected: 2 }));
    }

    #[test]
    fn empty_input_is_empty_input() {
        let err = parse(&[], &CleanConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput { rejected: 0 }));
    }
}
