//! Shared pipeline logic behind the subcommands.
//!
//! ingest (or generate) -> fit catalog -> select -> forecast
//!
//! The command handlers in `app` only map arguments and print.

use std::path::Path;

use log::debug;

use crate::data::{SampleConfig, SampleData, generate_progression};
use crate::domain::{AnalysisConfig, AnalysisResult, FitResult, ModelKind};
use crate::error::AppError;
use crate::fit::{analyze_with, fit_with};
use crate::io::{IngestedSeries, load_series};

/// Outputs of `rc analyze`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedSeries,
    pub analysis: AnalysisResult,
}

/// Outputs of `rc fit`.
#[derive(Debug, Clone)]
pub struct FitOutput {
    pub ingest: IngestedSeries,
    pub fit: FitResult,
}

/// Outputs of `rc sample`.
#[derive(Debug, Clone)]
pub struct SampleOutput {
    pub sample: SampleData,
    pub analysis: AnalysisResult,
}

pub fn run_analysis(path: &Path, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let ingest = load_series(path)?;
    debug!(
        "ingested {} of {} rows from {}",
        ingest.rows_used,
        ingest.rows_read,
        path.display()
    );
    let analysis = analyze_with(&ingest.series, config)?;
    Ok(RunOutput { ingest, analysis })
}

pub fn run_fit(path: &Path, model: ModelKind, config: &AnalysisConfig) -> Result<FitOutput, AppError> {
    let ingest = load_series(path)?;
    let fit = fit_with(&ingest.series, model, config)?;
    Ok(FitOutput { ingest, fit })
}

pub fn run_sample(
    sample_config: &SampleConfig,
    config: &AnalysisConfig,
) -> Result<SampleOutput, AppError> {
    let sample = generate_progression(sample_config)?;
    debug!(
        "sampled {} records from {} attempts ({})",
        sample.series.len(),
        sample.attempts,
        sample.model
    );
    let analysis = analyze_with(&sample.series, config)?;
    Ok(SampleOutput { sample, analysis })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_csv(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("rc-{}-{name}.csv", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn analysis_from_dated_csv() {
        let path = temp_csv(
            "dated",
            "date,time_seconds\n\
             2021-01-01,100\n\
             2021-01-11,90\n\
             2021-01-31,82\n\
             2021-03-02,77\n\
             2021-05-01,75\n",
        );
        let run = run_analysis(&path, &AnalysisConfig::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(run.ingest.series.elapsed(), vec![0.0, 10.0, 30.0, 60.0, 120.0]);
        assert!(run.analysis.is_good_fit());
    }

    #[test]
    fn too_few_rows_exit_with_code_3() {
        let path = temp_csv("short", "elapsed,value\n0,10\n1,9\n");
        let err = run_analysis(&path, &AnalysisConfig::default()).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = run_analysis(Path::new("/nonexistent/records.csv"), &AnalysisConfig::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn underdetermined_single_fit_is_numerical_failure() {
        let path = temp_csv("pair", "elapsed,value\n0,10\n1,9\n");
        let err = run_fit(&path, ModelKind::Hyperbolic, &AnalysisConfig::default()).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn noise_free_exponential_sample_is_recovered() {
        let sample_config = SampleConfig {
            noise_sd: 0.0,
            ..SampleConfig::default()
        };
        let out = run_sample(&sample_config, &AnalysisConfig::default()).unwrap();
        assert_eq!(out.analysis.best_model, Some(ModelKind::Exponential), "{:#?}", out.analysis);
        let exp = out.analysis.best().unwrap();
        assert!(exp.quality.r_squared > 0.999);
        for (got, want) in exp.params.iter().zip(&out.sample.true_params) {
            assert!((got - want).abs() <= 1e-3 * want.abs(), "{got} vs {want}");
        }
    }
}
