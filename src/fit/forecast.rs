//! Extrapolation with the selected model.
//!
//! Only models whose independent variable is elapsed time can be pushed past
//! the last record. Models with an asymptote parameter additionally yield a
//! theoretical limit and how much of the original gap to it remains.

use crate::domain::{AnalysisResult, FitResult, Forecast, LimitEstimate, Prediction, SeriesSummary};
use crate::error::PredictionError;
use crate::models::evaluate;

/// Evaluate the best model `h` past the last record for each horizon.
pub fn predict(result: &AnalysisResult, horizons: &[f64]) -> Result<Forecast, PredictionError> {
    let best = result.best().ok_or(PredictionError::NoBestModel)?;
    let model = best.model;
    if !model.is_forward_evaluable() {
        return Err(PredictionError::Unavailable { model });
    }

    let origin = result.summary.last_elapsed;
    let current = result.summary.current_value;

    let mut predictions = Vec::with_capacity(horizons.len());
    for &horizon in horizons {
        if !(horizon.is_finite() && horizon >= 0.0) {
            return Err(PredictionError::InvalidHorizon { horizon });
        }
        let elapsed = origin + horizon;
        let predicted_value = evaluate(model, elapsed, &best.params);
        if !predicted_value.is_finite() {
            return Err(PredictionError::NonFinitePrediction { model, elapsed });
        }
        predictions.push(Prediction {
            horizon,
            elapsed,
            predicted_value,
            improvement: current - predicted_value,
        });
    }

    Ok(Forecast {
        model,
        predictions,
        limit: theoretical_limit(best, &result.summary),
    })
}

/// Asymptote of `fit` together with the remaining share of the gap.
pub fn theoretical_limit(fit: &FitResult, summary: &SeriesSummary) -> Option<LimitEstimate> {
    let limit = fit.asymptote()?;
    Some(LimitEstimate {
        theoretical_limit: limit,
        percent_to_limit: percent_to_limit(summary.first_value, summary.current_value, limit),
    })
}

/// `(current − limit) / (first − limit) · 100`, or `None` when undefined.
pub fn percent_to_limit(first: f64, current: f64, limit: f64) -> Option<f64> {
    let denominator = first - limit;
    if denominator == 0.0 {
        return None;
    }
    let pct = (current - limit) / denominator * 100.0;
    pct.is_finite().then_some(pct)
}
