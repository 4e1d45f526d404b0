//! Parameter boxes and starting points for each catalog model.
//!
//! Both are derived from the series being fitted:
//! - the asymptote of every decay form is confined to `[0, y₀]`
//! - amplitude guesses use the total improvement `y₀ − y_last`
//! - asymptote guesses sit just below the current record (`0.95·y_last`)
//!
//! Starting points only need to land in a reasonable basin; the solver projects
//! them onto the box before iterating.

use crate::domain::{IndependentVariable, ModelKind, ObservationSeries};
use crate::error::SolverError;
use crate::math::Bounds;

/// Fraction of the current record used as the asymptote seed.
const ASYMPTOTE_SEED: f64 = 0.95;

/// Upper bounds on the rate/exponent parameter `b` for the three-parameter forms.
const EXPONENTIAL_RATE_MAX: f64 = 1.0;
const POWER_EXPONENT_MAX: f64 = 5.0;
const LOG_RATE_MAX: f64 = 10.0;
const HYPERBOLIC_RATE_MAX: f64 = 1.0;

/// Wright exponent range.
const WRIGHT_B_MIN: f64 = -2.0;
const WRIGHT_B_MAX: f64 = 0.0;
const WRIGHT_B_SEED: f64 = -0.3;

/// Box constraints for `model` given the first (worst) record `y0`.
///
/// Fails when `y0` is negative or non-finite, since the asymptote interval
/// `[0, y0]` is then empty.
pub fn parameter_bounds(model: ModelKind, y0: f64) -> Result<Bounds, SolverError> {
    let inf = f64::INFINITY;
    let (lower, upper) = match model {
        ModelKind::Exponential => (vec![0.0, 0.0, 0.0], vec![inf, EXPONENTIAL_RATE_MAX, y0]),
        ModelKind::PowerLaw => (vec![0.0, 0.0, 0.0], vec![inf, POWER_EXPONENT_MAX, y0]),
        ModelKind::Logarithmic => (vec![0.0, 0.0, 0.0], vec![inf, LOG_RATE_MAX, y0]),
        ModelKind::Hyperbolic => (vec![0.0, 0.0, 0.0], vec![inf, HYPERBOLIC_RATE_MAX, y0]),
        ModelKind::Wright => (vec![0.0, WRIGHT_B_MIN], vec![inf, WRIGHT_B_MAX]),
    };
    Bounds::new(lower, upper)
}

/// Heuristic starting point for `model`.
///
/// # Panics
/// Panics if `series` is empty; callers check the sample size first.
pub fn initial_guess(model: ModelKind, series: &ObservationSeries) -> Vec<f64> {
    let values = series.observations();
    let first = values[0].value;
    let last = values[values.len() - 1].value;
    let amplitude = first - last;
    let asymptote = ASYMPTOTE_SEED * last;

    match model {
        ModelKind::Exponential => vec![amplitude, 0.01, asymptote],
        ModelKind::PowerLaw => vec![amplitude, 0.5, asymptote],
        ModelKind::Logarithmic => vec![first, 0.1, 0.0],
        ModelKind::Hyperbolic => vec![amplitude, 0.01, asymptote],
        ModelKind::Wright => vec![first, WRIGHT_B_SEED],
    }
}

/// The independent variable the model is fitted against.
pub fn design_points(model: ModelKind, series: &ObservationSeries) -> Vec<f64> {
    match model.independent_variable() {
        IndependentVariable::Elapsed => series.elapsed(),
        IndependentVariable::RecordIndex => series.record_indices(),
    }
}
