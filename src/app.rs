//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - maps them onto `AnalysisConfig` / `SampleConfig`
//! - runs the pipeline
//! - prints the outcome as JSON

use clap::Parser;
use serde::Serialize;

use crate::cli::{AnalyzeArgs, Command, EngineArgs, FitArgs, SampleArgs};
use crate::data::{SampleConfig, SampleData};
use crate::domain::{AnalysisConfig, AnalysisResult, FitResult};
use crate::error::AppError;
use crate::io::{RowError, TimeAxis};
use crate::math::SolverOptions;

pub mod pipeline;

/// Entry point for the `rc` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Fit(args) => handle_fit(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// Where the series came from and what ingest made of it.
#[derive(Debug, Serialize)]
struct InputReport<'a> {
    path: String,
    time_axis: TimeAxis,
    rows_read: usize,
    rows_used: usize,
    row_errors: &'a [RowError],
}

#[derive(Debug, Serialize)]
struct AnalyzeReport<'a> {
    input: InputReport<'a>,
    good_fit: bool,
    analysis: &'a AnalysisResult,
}

#[derive(Debug, Serialize)]
struct NamedParam {
    name: &'static str,
    value: f64,
}

#[derive(Debug, Serialize)]
struct FitReport<'a> {
    input: InputReport<'a>,
    parameters: Vec<NamedParam>,
    asymptote: Option<f64>,
    learning_rate: Option<f64>,
    fit: &'a FitResult,
}

#[derive(Debug, Serialize)]
struct SampleReport<'a> {
    sample: &'a SampleData,
    good_fit: bool,
    analysis: &'a AnalysisResult,
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args.engine)?;
    let run = pipeline::run_analysis(&args.input, &config)?;

    print_json(&AnalyzeReport {
        input: InputReport {
            path: args.input.display().to_string(),
            time_axis: run.ingest.time_axis,
            rows_read: run.ingest.rows_read,
            rows_used: run.ingest.rows_used,
            row_errors: &run.ingest.row_errors,
        },
        good_fit: run.analysis.is_good_fit(),
        analysis: &run.analysis,
    })
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = AnalysisConfig {
        solver: solver_options(args.max_evaluations)?,
        ..AnalysisConfig::default()
    };
    let out = pipeline::run_fit(&args.input, args.model, &config)?;

    let parameters = out
        .fit
        .model
        .parameter_names()
        .iter()
        .zip(&out.fit.params)
        .map(|(&name, &value)| NamedParam { name, value })
        .collect();

    print_json(&FitReport {
        input: InputReport {
            path: args.input.display().to_string(),
            time_axis: out.ingest.time_axis,
            rows_read: out.ingest.rows_read,
            rows_used: out.ingest.rows_used,
            row_errors: &out.ingest.row_errors,
        },
        parameters,
        asymptote: out.fit.asymptote(),
        learning_rate: out.fit.learning_rate(),
        fit: &out.fit,
    })
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args.engine)?;
    let sample_config = SampleConfig {
        model: args.model,
        params: args.params,
        attempts: args.attempts,
        seed: args.seed,
        noise_sd: args.noise,
        mean_gap: args.mean_gap,
    };
    let out = pipeline::run_sample(&sample_config, &config)?;

    print_json(&SampleReport {
        sample: &out.sample,
        good_fit: out.analysis.is_good_fit(),
        analysis: &out.analysis,
    })
}

/// Map shared engine flags onto an `AnalysisConfig`, rejecting bad values.
pub fn analysis_config_from_args(args: &EngineArgs) -> Result<AnalysisConfig, AppError> {
    if args.min_samples == 0 {
        return Err(AppError::new(2, "--min-samples must be > 0."));
    }
    if let Some(h) = args.horizons.iter().find(|h| !(h.is_finite() && **h >= 0.0)) {
        return Err(AppError::new(
            2,
            format!("Invalid horizon {h}: horizons must be finite and >= 0."),
        ));
    }

    Ok(AnalysisConfig {
        min_samples: args.min_samples,
        solver: solver_options(args.max_evaluations)?,
        horizons: (!args.no_forecast).then(|| args.horizons.clone()),
    })
}

fn solver_options(max_evaluations: usize) -> Result<SolverOptions, AppError> {
    if max_evaluations == 0 {
        return Err(AppError::new(2, "--max-evaluations must be > 0."));
    }
    Ok(SolverOptions {
        max_evaluations,
        ..SolverOptions::default()
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(4, format!("Failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}
