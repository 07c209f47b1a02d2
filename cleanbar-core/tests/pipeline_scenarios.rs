//! End-to-end cleaning scenarios through the public `clean` entry point.

use chrono::{DateTime, TimeZone, Utc};
use cleanbar_core::data::{CsvSource, RawBarSource};
use cleanbar_core::fingerprint::RunFingerprint;
use cleanbar_core::{
    clean, AggregationPolicy, BarInterval, CanonicalBar, CleanConfig, DefectKind, PipelineError,
    RawBar, Resolution,
};
use std::path::PathBuf;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn bar(secs: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> RawBar {
    RawBar::new(at(secs), open, high, low, close, volume)
}

fn minute() -> BarInterval {
    BarInterval::from_secs(60).unwrap()
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn duplicate_and_gap_are_repaired() {
    let raw = vec![
        bar(0, 10.0, 11.0, 9.0, 10.5, 100.0),
        bar(0, 10.0, 11.0, 9.0, 10.5, 100.0),
        bar(120, 10.5, 12.0, 10.0, 11.0, 50.0),
    ];
    let out = clean(&raw, "BTC-USD", minute(), &CleanConfig::default()).unwrap();

    let ts: Vec<_> = out.series.bars().iter().map(|b| b.timestamp).collect();
    assert_eq!(ts, vec![at(0), at(60), at(120)]);

    let filled = out.series.bars()[1];
    assert!(filled.is_synthetic);
    assert_eq!(filled.close, 10.5);
    assert_eq!(filled.open, 10.5);
    assert_eq!(filled.volume, 0.0);

    assert_eq!(out.report.len(), 2);
    assert_eq!(out.report.count(DefectKind::DuplicateTimestamp), 1);
    assert_eq!(out.report.count(DefectKind::GapFilled), 1);
}

#[test]
fn inverted_bar_is_excluded_and_run_continues() {
    let raw = vec![
        bar(0, 10.0, 11.0, 9.0, 10.5, 100.0),
        bar(60, 7.0, 5.0, 9.0, 7.0, 10.0),
        bar(120, 10.5, 12.0, 10.0, 11.0, 50.0),
    ];
    let out = clean(&raw, "BTC-USD", minute(), &CleanConfig::default()).unwrap();

    assert_eq!(out.series.len(), 3);
    let invalid: Vec<_> = out.report.of_kind(DefectKind::InvalidValues).collect();
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].timestamp, at(60));
    assert_eq!(invalid[0].resolution, Resolution::Excluded);
    assert!(invalid[0].detail.contains("below low"));
    // the excluded slot is then filled
    assert!(out.series.bars()[1].is_synthetic);
}

#[test]
fn all_invalid_input_yields_no_series() {
    let raw = vec![
        bar(0, 10.0, 5.0, 9.0, 7.0, 1.0),
        bar(60, f64::NAN, 11.0, 9.0, 10.0, 1.0),
        bar(120, 10.0, 11.0, 9.0, 10.0, -3.0),
    ];
    let err = clean(&raw, "BTC-USD", minute(), &CleanConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyInput { rejected: 3 }));
}

#[test]
fn leading_gap_without_seed_fails() {
    let raw = vec![bar(120, 10.0, 11.0, 9.0, 10.5, 1.0)];
    let config = CleanConfig::default().with_window(Some(at(0)), None);

    let err = clean(&raw, "BTC-USD", minute(), &config).unwrap_err();
    match err {
        PipelineError::UnfillableGap { timestamp } => assert_eq!(timestamp, at(0)),
        other => panic!("expected UnfillableGap, got {other}"),
    }
}

#[test]
fn leading_gap_with_seed_carries_seed_close() {
    let raw = vec![bar(120, 10.0, 11.0, 9.0, 10.5, 1.0)];
    let seed = CanonicalBar {
        timestamp: at(-60),
        open: 9.0,
        high: 9.5,
        low: 8.5,
        close: 9.2,
        volume: 4.0,
        is_synthetic: false,
    };
    let config = CleanConfig::default()
        .with_window(Some(at(0)), None)
        .with_seed(seed);

    let out = clean(&raw, "BTC-USD", minute(), &config).unwrap();
    assert_eq!(out.series.len(), 3);
    assert_eq!(out.series.bars()[0].close, 9.2);
    assert_eq!(out.series.bars()[1].close, 9.2);
    assert_eq!(out.series.synthetic_count(), 2);
}

#[test]
fn clean_on_grid_input_round_trips() {
    let raw: Vec<RawBar> = (0..10)
        .map(|i| {
            let c = 100.0 + i as f64;
            bar(i * 60, c - 0.5, c + 1.0, c - 1.0, c, 10.0 + i as f64)
        })
        .collect();
    let out = clean(&raw, "ETH-USD", minute(), &CleanConfig::default()).unwrap();

    assert!(out.report.is_empty());
    assert_eq!(out.series.len(), raw.len());
    for (input, output) in raw.iter().zip(out.series.bars()) {
        assert_eq!(output.timestamp, input.timestamp);
        assert_eq!(Some(output.open), input.open);
        assert_eq!(Some(output.high), input.high);
        assert_eq!(Some(output.low), input.low);
        assert_eq!(Some(output.close), input.close);
        assert_eq!(Some(output.volume), input.volume);
        assert!(!output.is_synthetic);
    }
}

#[test]
fn repeated_runs_are_identical() {
    let raw = CsvSource::new(fixture("btc_1m_dirty.csv")).load().unwrap();
    let config = CleanConfig::default();

    let first = clean(&raw, "BTC-USD", minute(), &config).unwrap();
    let second = clean(&raw, "BTC-USD", minute(), &config).unwrap();
    assert_eq!(first, second);

    let fa = RunFingerprint::compute(&raw, "BTC-USD", minute(), &config, &first).unwrap();
    let fb = RunFingerprint::compute(&raw, "BTC-USD", minute(), &config, &second).unwrap();
    assert_eq!(fa, fb);
}

#[test]
fn dirty_fixture_report_accounts_for_every_repair() {
    let raw = CsvSource::new(fixture("btc_1m_dirty.csv")).load().unwrap();
    let out = clean(&raw, "BTC-USD", minute(), &CleanConfig::default()).unwrap();

    assert_eq!(out.series.len(), 8);
    assert_eq!(out.series.synthetic_count(), 3);

    let summary = out.report.summary();
    assert_eq!(summary.get(&DefectKind::InvalidValues), Some(&3));
    assert_eq!(summary.get(&DefectKind::DuplicateTimestamp), Some(&1));
    assert_eq!(summary.get(&DefectKind::GapFilled), Some(&3));
    assert_eq!(summary.get(&DefectKind::Aggregated), Some(&1));
    assert_eq!(summary.get(&DefectKind::OrderingClamped), Some(&1));
    assert_eq!(out.report.len(), 9);

    // coinbase replaced binance at 00:01
    assert_eq!(out.series.bars()[1].close, 42025.0);

    let merged = out.series.bars()[4];
    assert_eq!(merged.open, 42090.0);
    assert_eq!(merged.close, 42180.0);
    assert_eq!(merged.high, 42200.0);
    assert_eq!(merged.low, 42080.0);
    assert_eq!(merged.volume, 10.0);

    let clamped = out.series.bars()[7];
    assert_eq!(clamped.high, 42500.0);

    // report is time-ordered
    let times: Vec<_> = out.report.entries().iter().map(|d| d.timestamp).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);
}

#[test]
fn imputation_recovers_partial_bar() {
    let raw = CsvSource::new(fixture("btc_1m_dirty.csv")).load().unwrap();
    let config = CleanConfig::default().with_imputation(true);
    let out = clean(&raw, "BTC-USD", minute(), &config).unwrap();

    assert_eq!(out.report.count(DefectKind::FieldImputed), 1);
    assert_eq!(out.report.count(DefectKind::InvalidValues), 2);
    assert_eq!(out.report.count(DefectKind::GapFilled), 2);

    let recovered = out.series.bars()[5];
    assert!(!recovered.is_synthetic);
    assert_eq!(recovered.close, 42180.0);
}

#[test]
fn window_trims_and_extends() {
    let raw = vec![
        bar(0, 10.0, 11.0, 9.0, 10.5, 1.0),
        bar(60, 10.5, 11.0, 10.0, 10.8, 1.0),
        bar(120, 10.8, 11.2, 10.5, 11.0, 1.0),
    ];
    let config = CleanConfig::default().with_window(Some(at(60)), Some(at(240)));
    let out = clean(&raw, "BTC-USD", minute(), &config).unwrap();

    assert_eq!(out.series.first_timestamp(), Some(at(60)));
    assert_eq!(out.series.last_timestamp(), Some(at(240)));
    assert_eq!(out.series.len(), 4);
    assert_eq!(out.report.count(DefectKind::OutOfWindow), 1);
    assert_eq!(out.report.count(DefectKind::GapFilled), 2);
}

#[test]
fn last_policy_is_configurable_end_to_end() {
    let raw = vec![
        bar(0, 10.0, 11.0, 9.0, 10.5, 4.0),
        bar(30, 10.5, 11.5, 10.0, 11.0, 6.0),
    ];
    let sum = clean(&raw, "BTC-USD", minute(), &CleanConfig::default()).unwrap();
    let last = clean(
        &raw,
        "BTC-USD",
        minute(),
        &CleanConfig::default().with_aggregation(AggregationPolicy::Last),
    )
    .unwrap();
    assert_eq!(sum.series.bars()[0].volume, 10.0);
    assert_eq!(last.series.bars()[0].volume, 6.0);
}

#[test]
fn bar_at_max_date_cleans_without_panicking() {
    let raw = vec![RawBar::new(
        DateTime::<Utc>::MAX_UTC,
        10.0,
        11.0,
        9.0,
        10.5,
        1.0,
    )];
    let out = clean(&raw, "X-USD", minute(), &CleanConfig::default()).unwrap();
    assert_eq!(out.series.len(), 1);
    assert!(out.report.is_empty());
}

#[test]
fn overflowing_volume_is_saturated_not_an_integrity_error() {
    let raw = vec![
        bar(0, 10.0, 11.0, 9.0, 10.5, 1e308),
        bar(30, 10.5, 11.5, 10.0, 11.0, 1e308),
    ];
    let out = clean(&raw, "BTC-USD", minute(), &CleanConfig::default()).unwrap();
    assert_eq!(out.series.bars()[0].volume, f64::MAX);
    assert_eq!(out.report.count(DefectKind::Aggregated), 1);
}
