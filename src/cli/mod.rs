//! Command-line parsing for the record progression fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting code; `app` maps these structs onto `AnalysisConfig`/`SampleConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_HORIZONS, MIN_SAMPLES, ModelKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "rc",
    version,
    about = "Fit decay models to record progressions and extrapolate"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands. Every command prints JSON on stdout.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the whole catalog, select the best model by R², and forecast.
    Analyze(AnalyzeArgs),
    /// Fit a single model.
    Fit(FitArgs),
    /// Generate a synthetic progression from a model and analyze it.
    Sample(SampleArgs),
}

/// Solver and selection options shared by the subcommands.
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Minimum number of records required to analyze a series.
    #[arg(long, default_value_t = MIN_SAMPLES)]
    pub min_samples: usize,

    /// Cap on residual evaluations per model fit.
    #[arg(long, default_value_t = 10_000)]
    pub max_evaluations: usize,

    /// Forecast horizons past the last record (comma separated).
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_HORIZONS)]
    pub horizons: Vec<f64>,

    /// Skip the forecast.
    #[arg(long)]
    pub no_forecast: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// CSV with `date` (or `elapsed`) and `value` columns.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// CSV with `date` (or `elapsed`) and `value` columns.
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Model to fit.
    #[arg(short = 'm', long, value_enum)]
    pub model: ModelKind,

    /// Cap on residual evaluations.
    #[arg(long, default_value_t = 10_000)]
    pub max_evaluations: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Model the progression is drawn from.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelKind::Exponential)]
    pub model: ModelKind,

    /// True model parameters (comma separated); defaults depend on the model.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub params: Option<Vec<f64>>,

    /// Number of attempts to simulate.
    #[arg(short = 'n', long, default_value_t = 40)]
    pub attempts: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Relative noise standard deviation per attempt.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,

    /// Mean gap between attempts (days).
    #[arg(long, default_value_t = 20.0)]
    pub mean_gap: f64,

    #[command(flatten)]
    pub engine: EngineArgs,
}
