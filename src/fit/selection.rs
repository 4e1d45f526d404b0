//! Model selection across the whole catalog.
//!
//! The engine fits every catalog model and computes:
//! - SSE / RMSE
//! - R² = 1 − SSres/SStot
//! - AIC = n·ln(SSres/n) + 2k (reported, not used for selection)
//!
//! Selection rules:
//! 1. Refuse series shorter than `min_samples`
//! 2. Drop models whose fit failed (recorded in `failures`)
//! 3. Choose the maximum R²; ties within `R_SQUARED_TIE_TOLERANCE` go to the
//!    model listed first in the catalog

use log::{info, warn};
use rayon::prelude::*;

use crate::domain::{
    AnalysisConfig, AnalysisResult, FitResult, ModelFailure, ModelKind, ObservationSeries,
    SeriesSummary,
};
use crate::error::{AnalysisError, FitFailure};
use crate::fit::fitter::fit_with;
use crate::fit::forecast::predict;

/// R² differences at or below this are treated as ties.
pub const R_SQUARED_TIE_TOLERANCE: f64 = 1e-12;

/// Fit the full catalog with default settings and pick the best model.
pub fn analyze(series: &ObservationSeries) -> Result<AnalysisResult, AnalysisError> {
    analyze_with(series, &AnalysisConfig::default())
}

/// Fit the full catalog and pick the best model.
///
/// When `config.horizons` is set, the result also carries a forecast from the
/// best model (if that model supports one).
pub fn analyze_with(
    series: &ObservationSeries,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let needed = config.min_samples.max(1);
    let got = series.len();
    if got < needed {
        warn!("skipping series: {got} records, need at least {needed}");
        return Err(AnalysisError::InsufficientData { needed, got });
    }

    // Fits are independent; collect() keeps catalog order regardless of
    // which worker finishes first.
    let catalog: &[ModelKind] = &ModelKind::ALL;
    let outcomes: Vec<Result<FitResult, FitFailure>> = catalog
        .par_iter()
        .map(|&model| fit_with(series, model, config))
        .collect();

    let mut fits = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(fit) => fits.push(fit),
            Err(err) => {
                warn!("fit failed: {err}");
                failures.push(ModelFailure {
                    model: err.model(),
                    message: err.to_string(),
                });
            }
        }
    }

    let best = select_best(&fits).map(|f| (f.model, f.quality.r_squared));
    match best {
        Some((model, r2)) => info!("best model: {model} (R²={r2:.4})"),
        None => warn!("no model fitted successfully"),
    }

    let mut result = AnalysisResult {
        summary: summarize(series),
        fits,
        failures,
        best_model: best.map(|(model, _)| model),
        best_r_squared: best.map(|(_, r2)| r2),
        forecast: None,
        forecast_error: None,
    };

    if let Some(horizons) = &config.horizons {
        match predict(&result, horizons) {
            Ok(forecast) => result.forecast = Some(forecast),
            Err(err) => {
                info!("no forecast: {err}");
                result.forecast_error = Some(err.to_string());
            }
        }
    }

    Ok(result)
}

/// Pick the fit with the highest R².
///
/// Candidates are visited in catalog order and a later model only wins by
/// more than `R_SQUARED_TIE_TOLERANCE`, so the outcome does not depend on the
/// order of `fits`.
pub fn select_best(fits: &[FitResult]) -> Option<&FitResult> {
    let mut ordered: Vec<&FitResult> = fits
        .iter()
        .filter(|f| f.quality.r_squared.is_finite())
        .collect();
    ordered.sort_by_key(|f| f.model.catalog_index());

    let mut best: Option<&FitResult> = None;
    for fit in ordered {
        match best {
            Some(b) if fit.quality.r_squared <= b.quality.r_squared + R_SQUARED_TIE_TOLERANCE => {}
            _ => best = Some(fit),
        }
    }
    best
}

/// Headline numbers of a non-empty series.
fn summarize(series: &ObservationSeries) -> SeriesSummary {
    let obs = series.observations();
    let first = obs[0];
    let last = obs[obs.len() - 1];
    let improvement_percent = if first.value != 0.0 {
        Some((1.0 - last.value / first.value) * 100.0)
    } else {
        None
    };

    SeriesSummary {
        n_records: obs.len(),
        first_value: first.value,
        current_value: last.value,
        improvement_percent,
        last_elapsed: last.elapsed,
        elapsed_span: last.elapsed - first.elapsed,
    }
}
