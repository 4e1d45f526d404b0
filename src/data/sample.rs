//! Synthetic record progressions drawn from a catalog model.
//!
//! Attempts arrive with exponential inter-arrival gaps; each attempt scores the
//! clean model value times `1 + ε` with `ε ~ N(0, noise_sd)`. Only attempts
//! that beat the standing record are kept, so the output is always a valid
//! (strictly improving) progression.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal};
use serde::Serialize;

use crate::domain::{IndependentVariable, ModelKind, Observation, ObservationSeries};
use crate::error::AppError;
use crate::models::evaluate;

/// Generator settings.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub model: ModelKind,
    /// True parameters; `None` uses [`default_params`].
    pub params: Option<Vec<f64>>,
    /// Number of attempts (the kept record count is at most this).
    pub attempts: usize,
    pub seed: u64,
    /// Relative noise standard deviation.
    pub noise_sd: f64,
    /// Mean gap between attempts, in days.
    pub mean_gap: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Exponential,
            params: None,
            attempts: 40,
            seed: 42,
            noise_sd: 0.01,
            mean_gap: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleData {
    pub model: ModelKind,
    pub true_params: Vec<f64>,
    pub attempts: usize,
    pub series: ObservationSeries,
}

/// Plausible parameters: a 300s first record improving towards 200s.
pub fn default_params(model: ModelKind) -> Vec<f64> {
    match model {
        ModelKind::Exponential => vec![100.0, 0.01, 200.0],
        ModelKind::PowerLaw => vec![100.0, 0.5, 200.0],
        ModelKind::Logarithmic => vec![100.0, 0.5, 200.0],
        ModelKind::Hyperbolic => vec![100.0, 0.02, 200.0],
        ModelKind::Wright => vec![300.0, -0.15],
    }
}

pub fn generate_progression(config: &SampleConfig) -> Result<SampleData, AppError> {
    if config.attempts == 0 {
        return Err(AppError::new(2, "Attempt count must be > 0."));
    }
    if !(config.noise_sd.is_finite() && config.noise_sd >= 0.0) {
        return Err(AppError::new(2, "Noise standard deviation must be finite and >= 0."));
    }
    if !(config.mean_gap.is_finite() && config.mean_gap > 0.0) {
        return Err(AppError::new(2, "Mean gap must be finite and > 0."));
    }

    let model = config.model;
    let params = config
        .params
        .clone()
        .unwrap_or_else(|| default_params(model));
    if params.len() != model.param_count() || params.iter().any(|p| !p.is_finite()) {
        return Err(AppError::new(
            2,
            format!(
                "{model} expects {} finite parameters ({}), got {:?}.",
                model.param_count(),
                model.parameter_names().join(", "),
                params
            ),
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sd)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let gaps = Exp::new(1.0 / config.mean_gap)
        .map_err(|e| AppError::new(4, format!("Gap distribution error: {e}")))?;

    let mut observations: Vec<Observation> = Vec::new();
    let mut elapsed = 0.0;
    let mut record = f64::INFINITY;

    for attempt in 0..config.attempts {
        if attempt > 0 {
            elapsed += gaps.sample(&mut rng);
        }
        let x = match model.independent_variable() {
            IndependentVariable::Elapsed => elapsed,
            // The next record would be number len+1.
            IndependentVariable::RecordIndex => (observations.len() + 1) as f64,
        };
        let value = evaluate(model, x, &params) * (1.0 + noise.sample(&mut rng));
        if value.is_finite() && value < record {
            record = value;
            observations.push(Observation { elapsed, value });
        }
    }

    Ok(SampleData {
        model,
        true_params: params,
        attempts: config.attempts,
        series: ObservationSeries::new(observations),
    })
}
