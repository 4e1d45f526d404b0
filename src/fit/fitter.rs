//! Low-level fitting routine for a single model kind.
//!
//! Given a record progression and a catalog model, we:
//! - pick the model's independent variable (elapsed time or record index)
//! - derive its parameter box and starting point from the series
//! - run the bounded Levenberg–Marquardt solver on `f(x_i, θ) − y_i`
//! - score the result (R², RMSE, AIC)

use log::debug;
use nalgebra::DMatrix;

use crate::domain::{AnalysisConfig, FitQuality, FitResult, ModelKind, ObservationSeries, SolverSummary};
use crate::error::FitFailure;
use crate::math::{LeastSquaresProblem, aic, minimize, r_squared, rmse};
use crate::models::{design_points, evaluate, fill_gradient, initial_guess, parameter_bounds};

/// Residuals `f(x_i, θ) − y_i` of one model over one series.
struct CurveProblem<'a> {
    model: ModelKind,
    x: &'a [f64],
    y: &'a [f64],
}

impl LeastSquaresProblem for CurveProblem<'_> {
    fn param_count(&self) -> usize {
        self.model.param_count()
    }

    fn residual_count(&self) -> usize {
        self.x.len()
    }

    fn residuals(&self, params: &[f64], out: &mut [f64]) {
        for ((r, &x), &y) in out.iter_mut().zip(self.x).zip(self.y) {
            *r = evaluate(self.model, x, params) - y;
        }
    }

    fn jacobian(&self, params: &[f64], out: &mut DMatrix<f64>) -> bool {
        let mut row = vec![0.0; self.model.param_count()];
        for (i, &x) in self.x.iter().enumerate() {
            fill_gradient(self.model, x, params, &mut row);
            for (j, &g) in row.iter().enumerate() {
                out[(i, j)] = g;
            }
        }
        true
    }
}

/// Fit `model` to `series` with default solver settings.
pub fn fit(series: &ObservationSeries, model: ModelKind) -> Result<FitResult, FitFailure> {
    fit_with(series, model, &AnalysisConfig::default())
}

/// Fit `model` to `series`.
///
/// Fails without touching the solver when the series has non-finite entries or
/// fewer points than the model has parameters.
pub fn fit_with(
    series: &ObservationSeries,
    model: ModelKind,
    config: &AnalysisConfig,
) -> Result<FitResult, FitFailure> {
    let n = series.len();
    let k = model.param_count();

    if series
        .observations()
        .iter()
        .any(|o| !(o.elapsed.is_finite() && o.value.is_finite()))
    {
        return Err(FitFailure::NonFiniteInput { model });
    }
    if n < k {
        return Err(FitFailure::Underdetermined { model, n, k });
    }

    let x = design_points(model, series);
    let y = series.values();

    let bounds =
        parameter_bounds(model, y[0]).map_err(|source| FitFailure::Solver { model, source })?;
    let guess = initial_guess(model, series);

    let problem = CurveProblem {
        model,
        x: &x,
        y: &y,
    };
    let report = minimize(&problem, &guess, &bounds, &config.solver)
        .map_err(|source| FitFailure::Solver { model, source })?;

    let quality = FitQuality {
        sse: report.sse,
        rmse: rmse(n, report.sse),
        r_squared: r_squared(&y, report.sse),
        aic: aic(n, report.sse, k),
        n,
    };
    debug!(
        "fitted {model}: params={:?} r2={:.6} rmse={:.6} aic={:.3}",
        report.params, quality.r_squared, quality.rmse, quality.aic
    );

    Ok(FitResult {
        model,
        params: report.params,
        quality,
        solver: SolverSummary {
            method: report.method,
            termination: report.termination,
            evaluations: report.evaluations,
            iterations: report.iterations,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SolverMethod;

    fn exponential_series() -> ObservationSeries {
        let pairs: Vec<(f64, f64)> = (0..=200)
            .map(|i| {
                let x = i as f64;
                (x, evaluate(ModelKind::Exponential, x, &[50.0, 0.05, 10.0]))
            })
            .collect();
        ObservationSeries::from_pairs(&pairs)
    }

    #[test]
    fn exponential_round_trip_recovers_parameters() {
        let fit = fit(&exponential_series(), ModelKind::Exponential).unwrap();
        for (got, want) in fit.params.iter().zip([50.0, 0.05, 10.0]) {
            assert!(
                ((got - want) / want).abs() < 0.01,
                "params={:?}",
                fit.params
            );
        }
        assert!(fit.quality.r_squared > 0.999);
        assert_eq!(fit.quality.n, 201);
        assert_eq!(fit.solver.method, SolverMethod::BoundedLevenbergMarquardt);
    }

    #[test]
    fn wright_round_trip_on_record_index() {
        let pairs: Vec<(f64, f64)> = (1..=12)
            .map(|n| {
                let v = evaluate(ModelKind::Wright, n as f64, &[300.0, -0.25]);
                (n as f64 * 7.0, v)
            })
            .collect();
        let fit = fit(&ObservationSeries::from_pairs(&pairs), ModelKind::Wright).unwrap();
        assert!((fit.params[0] - 300.0).abs() < 1e-3, "{:?}", fit.params);
        assert!((fit.params[1] + 0.25).abs() < 1e-6, "{:?}", fit.params);
        assert!((fit.learning_rate().unwrap() - 2f64.powf(-0.25)).abs() < 1e-6);
    }

    #[test]
    fn fewer_points_than_parameters_fails() {
        let series = ObservationSeries::from_pairs(&[(0.0, 10.0), (5.0, 9.0)]);
        let err = fit(&series, ModelKind::Hyperbolic).unwrap_err();
        assert_eq!(
            err,
            FitFailure::Underdetermined {
                model: ModelKind::Hyperbolic,
                n: 2,
                k: 3
            }
        );
        assert!(fit(&series, ModelKind::Wright).is_ok());
    }

    #[test]
    fn non_finite_values_fail() {
        let series = ObservationSeries::from_pairs(&[
            (0.0, 10.0),
            (1.0, f64::NAN),
            (2.0, 8.0),
            (3.0, 7.5),
            (4.0, 7.4),
        ]);
        for model in ModelKind::ALL {
            assert_eq!(
                fit(&series, model).unwrap_err(),
                FitFailure::NonFiniteInput { model }
            );
        }
    }

    #[test]
    fn negative_first_record_is_a_solver_failure_not_a_panic() {
        let series = ObservationSeries::from_pairs(&[
            (0.0, -1.0),
            (1.0, -2.0),
            (2.0, -3.0),
            (3.0, -3.5),
            (4.0, -3.6),
        ]);
        let err = fit(&series, ModelKind::PowerLaw).unwrap_err();
        assert!(matches!(err, FitFailure::Solver { .. }), "{err:?}");
    }

    #[test]
    fn evaluation_cap_reports_failure() {
        let mut config = AnalysisConfig::default();
        config.solver.max_evaluations = 2;
        let err = fit_with(&exponential_series(), ModelKind::Exponential, &config).unwrap_err();
        assert!(matches!(
            err,
            FitFailure::Solver {
                source: crate::error::SolverError::MaxEvaluations { .. },
                ..
            }
        ));
    }

    #[test]
    fn constant_series_scores_zero_r_squared() {
        let series = ObservationSeries::from_pairs(&[
            (0.0, 42.0),
            (3.0, 42.0),
            (9.0, 42.0),
            (20.0, 42.0),
            (44.0, 42.0),
        ]);
        for model in ModelKind::ALL {
            let fit = fit(&series, model).unwrap();
            assert_eq!(fit.quality.r_squared, 0.0, "{model}");
        }
    }
}
