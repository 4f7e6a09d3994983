use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod analysis;
mod confidence;
mod config;
mod models;
mod output;
mod stats;

use crate::analysis::RegressionEngine;
use crate::config::AnalysisConfig;
use crate::models::{ModelTarget, RunRecord, Severity};
use crate::output::OutputFormat;

/// Benchmark Regression Gate - compare candidate benchmark runs against a
/// baseline and fail CI on statistically significant regressions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Baseline run record JSON files
    #[arg(long = "baseline", required = true, num_args = 1..)]
    baseline: Vec<PathBuf>,

    /// Candidate run record JSON files
    #[arg(long = "candidate", required = true, num_args = 1..)]
    candidate: Vec<PathBuf>,

    /// Path to a TOML file overriding default thresholds and statistics
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Restrict analysis to specific provider:model pairs (repeatable)
    #[arg(long = "model")]
    models: Vec<String>,

    /// Output format: plain, json or summary
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Exit nonzero when a regression at or above this severity is detected
    #[arg(long)]
    fail_on: Option<Severity>,

    /// Optional local path to store the report as JSON
    #[arg(long)]
    store: Option<PathBuf>,

    /// Verbose output - log each analysis step
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    let baseline = RunRecord::load_all(&args.baseline)?;
    let candidate = RunRecord::load_all(&args.candidate)?;
    let filter: Vec<ModelTarget> = args.models.iter().map(|s| ModelTarget::parse(s)).collect();

    let engine = RegressionEngine::new(config);
    let report = engine.analyze(&baseline, &candidate, &filter)?;

    output::print_report(&report, args.output);

    if let Some(path) = &args.store {
        output::store_report(&report, path)?;
    }

    if output::should_fail(&report, args.fail_on) {
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
