//! Model evaluation for the decay catalog.
//!
//! The fitter relies on two primitive operations:
//! - evaluate `f(x, θ)` (for residuals and forecasts)
//! - fill the gradient `∂f/∂θ` at one point (a Jacobian row)
//!
//! These are implemented here for each model kind.

use crate::domain::ModelKind;

/// Evaluate `f(x, θ)` for the given model kind.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`.
pub fn evaluate(model: ModelKind, x: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::Exponential => {
            let (a, b, c) = (params[0], params[1], params[2]);
            a * (-b * x).exp() + c
        }
        ModelKind::PowerLaw => {
            let (a, b, c) = (params[0], params[1], params[2]);
            a * (x + 1.0).powf(-b) + c
        }
        ModelKind::Logarithmic => {
            let (a, b, c) = (params[0], params[1], params[2]);
            a / (1.0 + b * (x + 1.0).ln()) + c
        }
        ModelKind::Hyperbolic => {
            let (a, b, c) = (params[0], params[1], params[2]);
            a / (1.0 + b * x) + c
        }
        ModelKind::Wright => {
            let (t1, b) = (params[0], params[1]);
            t1 * x.powf(b)
        }
    }
}

/// Fill `out` with `∂f/∂θ_j` at `x`.
///
/// # Panics
/// Panics if `params` or `out` is shorter than `model.param_count()`.
pub fn fill_gradient(model: ModelKind, x: f64, params: &[f64], out: &mut [f64]) {
    match model {
        ModelKind::Exponential => {
            let (a, b) = (params[0], params[1]);
            let e = (-b * x).exp();
            out[0] = e;
            out[1] = -a * x * e;
            out[2] = 1.0;
        }
        ModelKind::PowerLaw => {
            let (a, b) = (params[0], params[1]);
            let base = x + 1.0;
            let p = base.powf(-b);
            out[0] = p;
            out[1] = -a * base.ln() * p;
            out[2] = 1.0;
        }
        ModelKind::Logarithmic => {
            let (a, b) = (params[0], params[1]);
            let l = (x + 1.0).ln();
            let d = 1.0 + b * l;
            out[0] = 1.0 / d;
            out[1] = -a * l / (d * d);
            out[2] = 1.0;
        }
        ModelKind::Hyperbolic => {
            let (a, b) = (params[0], params[1]);
            let d = 1.0 + b * x;
            out[0] = 1.0 / d;
            out[1] = -a * x / (d * d);
            out[2] = 1.0;
        }
        ModelKind::Wright => {
            let (t1, b) = (params[0], params[1]);
            let p = x.powf(b);
            out[0] = p;
            out[1] = t1 * x.ln() * p;
        }
    }
}
