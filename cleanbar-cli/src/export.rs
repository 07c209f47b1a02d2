//! Output formats for cleaned series, defect reports and raw bars.
//!
//! - **CSV**: one row per bar, or one row per defect
//! - **JSON**: series, report and fingerprint in a single document

use anyhow::{Context, Result};
use cleanbar_core::fingerprint::RunFingerprint;
use cleanbar_core::{CleanOutput, DefectReport, RawBar, Series};
use serde::Serialize;

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: timestamp, open, high, low, close, volume, is_synthetic
pub fn series_csv(series: &Series) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "is_synthetic",
    ])?;
    for bar in series.bars() {
        wtr.write_record([
            bar.timestamp.to_rfc3339(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
            bar.is_synthetic.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Columns: timestamp, kind, resolution, detail
pub fn report_csv(report: &DefectReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "kind", "resolution", "detail"])?;
    for defect in report.entries() {
        wtr.write_record([
            defect.timestamp.to_rfc3339().as_str(),
            defect.kind.as_str(),
            defect.resolution.as_str(),
            defect.detail.as_str(),
        ])?;
    }
    finish(wtr)
}

/// Raw bars in the input CSV layout; missing values are empty cells.
pub fn raw_csv(bars: &[RawBar]) -> Result<String> {
    fn cell(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "source_id",
    ])?;
    for bar in bars {
        wtr.write_record([
            bar.timestamp.to_rfc3339(),
            cell(bar.open),
            cell(bar.high),
            cell(bar.low),
            cell(bar.close),
            cell(bar.volume),
            bar.source_id.clone(),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

#[derive(Serialize)]
struct CleanArtifact<'a> {
    fingerprint: &'a RunFingerprint,
    series: &'a Series,
    report: &'a DefectReport,
}

/// Pretty JSON of a finished run with its fingerprint.
pub fn output_json(output: &CleanOutput, fingerprint: &RunFingerprint) -> Result<String> {
    let artifact = CleanArtifact {
        fingerprint,
        series: &output.series,
        report: &output.report,
    };
    serde_json::to_string_pretty(&artifact).context("failed to serialize clean output to JSON")
}
