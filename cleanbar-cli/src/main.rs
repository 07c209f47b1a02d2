//! cleanbar CLI: clean, inspect and synthesize OHLCV bar files.
//!
//! Commands:
//! - `clean`: load CSV/JSON inputs, clean them onto a grid, write series + report
//! - `inspect`: summarize inputs without cleaning: range, inferred interval, rejects
//! - `synth`: write a seeded dirty dataset for experiments
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); data goes to stdout or `--output`.

mod export;
mod job;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use cleanbar_core::data::{load_all, parse_timestamp, source_for_path, RawBarSource};
use cleanbar_core::domain::normalize_symbol;
use cleanbar_core::fingerprint::RunFingerprint;
use cleanbar_core::pipeline::parse;
use cleanbar_core::synthetic::{generate_dirty_bars, DirtyDataSpec};
use cleanbar_core::{
    clean, infer_interval, AggregationPolicy, BarInterval, CleanConfig, DefectKind, RawBar,
};
use job::{IntervalArg, JobFile};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cleanbar", about = "cleanbar: OHLCV cleaning and normalization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Aggregation {
    Sum,
    Last,
}

impl From<Aggregation> for AggregationPolicy {
    fn from(value: Aggregation) -> Self {
        match value {
            Aggregation::Sum => AggregationPolicy::Sum,
            Aggregation::Last => AggregationPolicy::Last,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Clean raw bars into a gap-free series on a fixed interval grid.
    Clean {
        /// Input files (.csv or .json). Later files win duplicate timestamps.
        inputs: Vec<PathBuf>,

        /// TOML job file (symbol, interval, inputs, [clean] section). Flags override it.
        #[arg(long)]
        job: Option<PathBuf>,

        /// Symbol, normalized to BASE-QUOTE (e.g. btc -> BTC-USD).
        #[arg(long)]
        symbol: Option<String>,

        /// Bar interval (30s, 1m, 5m, 1h, 1d) or "auto" to infer from the data.
        #[arg(long)]
        interval: Option<IntervalArg>,

        /// Snap timestamps within this many milliseconds of a grid point.
        #[arg(long)]
        tolerance_ms: Option<u64>,

        /// Volume aggregation for slots with several raw bars.
        #[arg(long, value_enum)]
        aggregation: Option<Aggregation>,

        /// Fill missing OHLC fields from earlier bars instead of rejecting the bar.
        #[arg(long, default_value_t = false)]
        impute: bool,

        /// Keep bars with zero or negative prices.
        #[arg(long, default_value_t = false)]
        allow_non_positive: bool,

        /// First grid slot of the output (timestamp, date, or epoch seconds/milliseconds).
        #[arg(long)]
        window_start: Option<String>,

        /// Last grid slot of the output.
        #[arg(long)]
        window_end: Option<String>,

        /// Output format for the series.
        #[arg(long, value_enum, default_value = "csv")]
        format: Format,

        /// Write the series here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the defect report (CSV) here.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Summarize inputs: bar count, time range, inferred interval, would-be rejects.
    Inspect {
        /// Input files (.csv or .json).
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Generate a seeded dirty dataset as CSV.
    Synth {
        /// Number of grid slots.
        #[arg(long, default_value_t = 1_000)]
        bars: usize,

        /// Bar interval.
        #[arg(long, default_value = "1m")]
        interval: BarInterval,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First slot (timestamp, date, or epoch seconds/milliseconds). Defaults to 2024-01-01.
        #[arg(long)]
        start: Option<String>,

        /// Maximum timestamp jitter in milliseconds.
        #[arg(long, default_value_t = 0)]
        jitter_ms: u64,

        /// Generate clean on-grid data with no defects.
        #[arg(long, default_value_t = false)]
        pristine: bool,

        /// Write here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean {
            inputs,
            job,
            symbol,
            interval,
            tolerance_ms,
            aggregation,
            impute,
            allow_non_positive,
            window_start,
            window_end,
            format,
            output,
            report,
        } => {
            let mut job = match job {
                Some(path) => JobFile::from_file(&path)?,
                None => JobFile::default(),
            };
            if !inputs.is_empty() {
                job.inputs = inputs;
            }
            if let Some(tolerance_ms) = tolerance_ms {
                job.clean.tolerance_ms = tolerance_ms;
            }
            if let Some(aggregation) = aggregation {
                job.clean.aggregation_policy = aggregation.into();
            }
            if impute {
                job.clean.impute_missing_fields = true;
            }
            if allow_non_positive {
                job.clean.reject_non_positive_prices = false;
            }
            if let Some(ts) = window_start.as_deref() {
                job.clean.window_start = Some(parse_time_arg("--window-start", ts)?);
            }
            if let Some(ts) = window_end.as_deref() {
                job.clean.window_end = Some(parse_time_arg("--window-end", ts)?);
            }

            let symbol = symbol
                .or_else(|| job.symbol.clone())
                .context("a symbol is required (--symbol or `symbol` in the job file)")?;
            let interval = match interval {
                Some(arg) => arg,
                None => job.interval()?.unwrap_or(IntervalArg::Auto),
            };

            run_clean(
                &job,
                &symbol,
                interval,
                format,
                output.as_deref(),
                report.as_deref(),
            )
        }
        Commands::Inspect { inputs } => run_inspect(&inputs),
        Commands::Synth {
            bars,
            interval,
            seed,
            start,
            jitter_ms,
            pristine,
            output,
        } => {
            let mut spec = if pristine {
                DirtyDataSpec::pristine(bars, interval, seed)
            } else {
                DirtyDataSpec {
                    bars,
                    interval,
                    seed,
                    ..DirtyDataSpec::default()
                }
            };
            spec.jitter_ms = jitter_ms;
            if let Some(ts) = start.as_deref() {
                spec.start = parse_time_arg("--start", ts)?;
            }
            run_synth(&spec, output.as_deref())
        }
    }
}

fn parse_time_arg(flag: &str, value: &str) -> Result<DateTime<Utc>> {
    match parse_timestamp(value) {
        Some(ts) => Ok(ts),
        None => bail!("{flag}: cannot parse '{value}' as a timestamp"),
    }
}

fn load_inputs(inputs: &[PathBuf]) -> Result<Vec<RawBar>> {
    if inputs.is_empty() {
        bail!("no input files given");
    }
    let sources: Vec<Box<dyn RawBarSource>> = inputs
        .iter()
        .map(|p| source_for_path(p))
        .collect::<Result<_, _>>()?;
    Ok(load_all(&sources)?)
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

fn resolve_interval(arg: IntervalArg, raw: &[RawBar]) -> Result<BarInterval> {
    match arg {
        IntervalArg::Fixed(interval) => Ok(interval),
        IntervalArg::Auto => {
            let interval = infer_interval(raw).context("cannot infer interval; pass --interval")?;
            info!(%interval, "inferred interval");
            Ok(interval)
        }
    }
}

fn run_clean(
    job: &JobFile,
    symbol: &str,
    interval: IntervalArg,
    format: Format,
    output: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<()> {
    let raw = load_inputs(&job.inputs)?;
    let symbol = normalize_symbol(symbol);
    let interval = resolve_interval(interval, &raw)?;

    let out = clean(&raw, &symbol, interval, &job.clean)
        .with_context(|| format!("cleaning {symbol} at {interval} failed"))?;
    let fingerprint = RunFingerprint::compute(&raw, &symbol, interval, &job.clean, &out)
        .context("failed to fingerprint run")?;

    for (kind, count) in out.report.summary() {
        info!(kind = %kind, count, "defects");
    }
    info!(
        symbol = %symbol,
        bars = out.series.len(),
        synthetic = out.series.synthetic_count(),
        series_hash = fingerprint.series_hash.short(),
        "done"
    );

    let body = match format {
        Format::Csv => export::series_csv(&out.series)?,
        Format::Json => export::output_json(&out, &fingerprint)?,
    };
    emit(&body, output)?;

    if let Some(path) = report_path {
        emit(&export::report_csv(&out.report)?, Some(path))?;
    }
    Ok(())
}

fn run_inspect(inputs: &[PathBuf]) -> Result<()> {
    let raw = load_inputs(inputs)?;

    let first = raw.iter().map(|b| b.timestamp).min();
    let last = raw.iter().map(|b| b.timestamp).max();
    let incomplete = raw.iter().filter(|b| !b.is_complete()).count();

    println!("Bars: {}", raw.len());
    if let (Some(first), Some(last)) = (first, last) {
        println!("Range: {} to {}", first.to_rfc3339(), last.to_rfc3339());
    }
    match infer_interval(&raw) {
        Ok(interval) => println!("Inferred interval: {interval}"),
        Err(e) => println!("Inferred interval: unknown ({e})"),
    }
    println!("Incomplete bars: {incomplete}");

    match parse(&raw, &CleanConfig::default()) {
        Ok(parsed) => {
            let defects = parsed.defects();
            let invalid = defects
                .iter()
                .filter(|d| d.kind == DefectKind::InvalidValues)
                .count();
            println!("Would reject: {invalid}");
            println!("Duplicate timestamps: {}", defects.len() - invalid);
            for defect in defects.iter().take(20) {
                println!("  {defect}");
            }
            if defects.len() > 20 {
                println!("  ... {} more", defects.len() - 20);
            }
        }
        Err(e) => warn!("no usable bars: {e}"),
    }
    Ok(())
}

fn run_synth(spec: &DirtyDataSpec, output: Option<&Path>) -> Result<()> {
    let bars = generate_dirty_bars(spec);
    info!(
        slots = spec.bars,
        records = bars.len(),
        seed = spec.seed,
        interval = %spec.interval,
        "generated synthetic bars"
    );
    emit(&export::raw_csv(&bars)?, output)
}
