//! Box-constrained Levenberg–Marquardt.
//!
//! We solve small nonlinear least-squares problems of the form:
//!
//! ```text
//! minimize Σ r_i(θ)^2   subject to   lower ≤ θ ≤ upper
//! ```
//!
//! where `r_i = f(x_i, θ) − y_i`. Parameter counts are tiny (2–3), so every
//! iteration forms the normal equations `JᵀJ` explicitly and solves the damped
//! system with a Cholesky factorization.
//!
//! Bounds are handled with an active set: a parameter sitting on a bound whose
//! descent direction points out of the box is frozen for the iteration, the
//! damped step is solved over the remaining parameters, and the trial point is
//! projected back onto the box. With no finite bound this reduces to classic
//! Levenberg–Marquardt, and the report says which variant ran.
//!
//! Termination follows MINPACK's conventions (relative cost reduction, relative
//! step size, and the cosine between residual and Jacobian columns).

use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// Relative forward-difference step, `sqrt(f64::EPSILON)`.
const FD_STEP: f64 = 1.490_116_119_384_765_6e-8;

/// Damping limits.
const LAMBDA_MIN: f64 = 1e-15;
const LAMBDA_MAX: f64 = 1e16;

/// Marquardt scaling floor relative to the largest `JᵀJ` diagonal entry.
const DIAG_FLOOR: f64 = 1e-12;

/// Which solver variant ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    /// No finite bound on any parameter.
    LevenbergMarquardt,
    /// At least one finite bound; active-set projected steps.
    BoundedLevenbergMarquardt,
}

/// Why the solver stopped (successfully).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Residuals vanished.
    ExactFit,
    /// Actual and predicted relative reductions fell below `ftol`.
    CostTolerance,
    /// The step became negligible relative to the parameters.
    StepTolerance,
    /// The projected gradient became orthogonal to the residual vector.
    GradientTolerance,
}

/// Solver limits and tolerances.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Residual evaluations allowed, including finite-difference probes.
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_lambda: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 10_000,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            initial_lambda: 1e-3,
        }
    }
}

/// Component-wise parameter box. Infinite ends mean "unbounded".
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, SolverError> {
        if lower.len() != upper.len() {
            return Err(SolverError::DimensionMismatch {
                expected: lower.len(),
                got: upper.len(),
            });
        }
        for (index, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
            let valid = !lo.is_nan()
                && !hi.is_nan()
                && lo <= hi
                && lo != f64::INFINITY
                && hi != f64::NEG_INFINITY;
            if !valid {
                return Err(SolverError::InvalidBounds {
                    index,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// True if any end of any interval is finite.
    pub fn is_bounded(&self) -> bool {
        self.lower.iter().chain(self.upper.iter()).any(|b| b.is_finite())
    }

    pub fn is_fixed(&self, index: usize) -> bool {
        self.lower[index] == self.upper[index]
    }

    pub fn contains(&self, params: &[f64]) -> bool {
        params.len() == self.len()
            && params
                .iter()
                .enumerate()
                .all(|(i, &p)| p >= self.lower[i] && p <= self.upper[i])
    }

    /// Clamp `params` onto the box in place.
    pub fn project(&self, params: &mut [f64]) {
        for (i, p) in params.iter_mut().enumerate() {
            *p = p.clamp(self.lower[i], self.upper[i]);
        }
    }
}

/// A nonlinear least-squares objective.
pub trait LeastSquaresProblem {
    fn param_count(&self) -> usize;

    fn residual_count(&self) -> usize;

    /// Write the residuals `model − observed` at `params` into `out`.
    fn residuals(&self, params: &[f64], out: &mut [f64]);

    /// Fill `out` (`residual_count × param_count`) with `∂r_i/∂θ_j`.
    ///
    /// Returns `false` when no analytic form is available, in which case the
    /// solver uses forward differences that respect the bounds.
    fn jacobian(&self, _params: &[f64], _out: &mut DMatrix<f64>) -> bool {
        false
    }
}

/// Successful solver outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverReport {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub sse: f64,
    pub method: SolverMethod,
    pub termination: Termination,
    pub evaluations: usize,
    pub iterations: usize,
}

/// Minimize `Σ r_i²` inside `bounds`, starting from `initial`.
///
/// A starting point outside the box is projected onto it first.
pub fn minimize<P>(
    problem: &P,
    initial: &[f64],
    bounds: &Bounds,
    options: &SolverOptions,
) -> Result<SolverReport, SolverError>
where
    P: LeastSquaresProblem + ?Sized,
{
    let n = problem.param_count();
    let m = problem.residual_count();
    if initial.len() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: initial.len(),
        });
    }
    if bounds.len() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: bounds.len(),
        });
    }

    let method = if bounds.is_bounded() {
        SolverMethod::BoundedLevenbergMarquardt
    } else {
        SolverMethod::LevenbergMarquardt
    };

    let mut x = initial.to_vec();
    bounds.project(&mut x);

    let mut r = vec![0.0; m];
    problem.residuals(&x, &mut r);
    let mut evaluations = 1usize;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::NonFiniteStart);
    }
    let mut sse = sum_of_squares(&r);

    let mut lambda = options.initial_lambda;
    let mut jac = DMatrix::<f64>::zeros(m, n);
    let mut r_trial = vec![0.0; m];
    let mut iterations = 0usize;

    let finish = |termination: Termination,
                  x: Vec<f64>,
                  sse: f64,
                  evaluations: usize,
                  iterations: usize|
     -> Result<SolverReport, SolverError> {
        debug!(
            "{method:?} stopped ({termination:?}) after {iterations} iterations, \
             {evaluations} evaluations, sse={sse:.6e}"
        );
        Ok(SolverReport {
            params: x,
            sse,
            method,
            termination,
            evaluations,
            iterations,
        })
    };

    loop {
        if sse <= f64::MIN_POSITIVE {
            return finish(Termination::ExactFit, x, sse, evaluations, iterations);
        }
        if evaluations >= options.max_evaluations {
            return Err(SolverError::MaxEvaluations { evaluations, sse });
        }
        iterations += 1;

        if !problem.jacobian(&x, &mut jac) {
            evaluations += forward_difference(problem, &x, &r, bounds, &mut jac, &mut r_trial);
        }
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFiniteJacobian { evaluations });
        }

        let residual = DVector::from_column_slice(&r);
        let jt = jac.transpose();
        let jtj = &jt * &jac;
        let grad = &jt * &residual;

        let free: Vec<usize> = (0..n).filter(|&i| is_free(i, &x, &grad, bounds)).collect();
        if free.is_empty() || gradient_converged(&jac, &grad, &free, sse, options.gtol) {
            return finish(Termination::GradientTolerance, x, sse, evaluations, iterations);
        }

        let x_norm = norm(&x);
        let max_diag = free.iter().map(|&i| jtj[(i, i)]).fold(0.0, f64::max);
        let diag_floor = (max_diag * DIAG_FLOOR).max(f64::MIN_POSITIVE);

        // Inner loop: raise damping until a step lowers the cost.
        loop {
            let k = free.len();
            let mut a = DMatrix::<f64>::zeros(k, k);
            let mut b = DVector::<f64>::zeros(k);
            for (p, &i) in free.iter().enumerate() {
                for (q, &j) in free.iter().enumerate() {
                    a[(p, q)] = jtj[(i, j)];
                }
                a[(p, p)] += lambda * jtj[(i, i)].max(diag_floor);
                b[p] = -grad[i];
            }

            let Some(chol) = a.cholesky() else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    return finish(Termination::StepTolerance, x, sse, evaluations, iterations);
                }
                continue;
            };
            let delta = chol.solve(&b);

            let mut x_trial = x.clone();
            for (p, &i) in free.iter().enumerate() {
                x_trial[i] += delta[p];
            }
            bounds.project(&mut x_trial);
            let step: Vec<f64> = x_trial.iter().zip(x.iter()).map(|(t, c)| t - c).collect();
            let step_norm = norm(&step);
            let step_negligible = step_norm <= options.xtol * (options.xtol + x_norm);

            problem.residuals(&x_trial, &mut r_trial);
            evaluations += 1;
            let sse_trial = if r_trial.iter().all(|v| v.is_finite()) {
                sum_of_squares(&r_trial)
            } else {
                f64::INFINITY
            };

            if sse_trial < sse {
                let linearized = &residual + &jac * DVector::from_vec(step);
                let sse_predicted = linearized.norm_squared();
                let actual = (sse - sse_trial) / sse;
                let predicted = (sse - sse_predicted) / sse;

                x = x_trial;
                std::mem::swap(&mut r, &mut r_trial);
                sse = sse_trial;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);

                if actual <= options.ftol && predicted.abs() <= options.ftol {
                    return finish(Termination::CostTolerance, x, sse, evaluations, iterations);
                }
                if step_negligible {
                    return finish(Termination::StepTolerance, x, sse, evaluations, iterations);
                }
                break;
            }

            lambda *= 10.0;
            if step_negligible || lambda > LAMBDA_MAX {
                return finish(Termination::StepTolerance, x, sse, evaluations, iterations);
            }
            if evaluations >= options.max_evaluations {
                return Err(SolverError::MaxEvaluations { evaluations, sse });
            }
        }
    }
}

/// Sum of squares of a residual vector.
pub fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

fn norm(values: &[f64]) -> f64 {
    sum_of_squares(values).sqrt()
}

/// A parameter is free unless it is fixed or pinned to a bound by the gradient.
fn is_free(index: usize, x: &[f64], grad: &DVector<f64>, bounds: &Bounds) -> bool {
    if bounds.is_fixed(index) {
        return false;
    }
    let pinned_low = x[index] <= bounds.lower()[index] && grad[index] > 0.0;
    let pinned_high = x[index] >= bounds.upper()[index] && grad[index] < 0.0;
    !(pinned_low || pinned_high)
}

fn gradient_converged(
    jac: &DMatrix<f64>,
    grad: &DVector<f64>,
    free: &[usize],
    sse: f64,
    gtol: f64,
) -> bool {
    let r_norm = sse.sqrt();
    if r_norm == 0.0 {
        return true;
    }
    free.iter().all(|&i| {
        let col = jac.column(i).norm();
        col == 0.0 || grad[i].abs() / (col * r_norm) <= gtol
    })
}

/// Forward-difference Jacobian. Returns the number of residual evaluations used.
fn forward_difference<P>(
    problem: &P,
    x: &[f64],
    r0: &[f64],
    bounds: &Bounds,
    jac: &mut DMatrix<f64>,
    scratch: &mut [f64],
) -> usize
where
    P: LeastSquaresProblem + ?Sized,
{
    let mut probe = x.to_vec();
    let mut evaluations = 0;
    for j in 0..x.len() {
        let h = difference_step(x[j], bounds.lower()[j], bounds.upper()[j]);
        if h == 0.0 {
            jac.column_mut(j).fill(0.0);
            continue;
        }
        probe[j] = x[j] + h;
        problem.residuals(&probe, scratch);
        evaluations += 1;
        for (i, (&ri, &r0i)) in scratch.iter().zip(r0.iter()).enumerate() {
            jac[(i, j)] = (ri - r0i) / h;
        }
        probe[j] = x[j];
    }
    evaluations
}

/// Step that keeps the probe inside `[lower, upper]`, flipping direction near
/// the upper bound and shrinking when the interval is narrower than the step.
fn difference_step(x: f64, lower: f64, upper: f64) -> f64 {
    let h = FD_STEP * x.abs().max(1.0);
    let room_up = upper - x;
    let room_down = x - lower;
    if room_up >= h {
        h
    } else if room_down >= h {
        -h
    } else if room_up >= room_down {
        room_up
    } else {
        -room_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rosenbrock in least-squares form: r = (10(y − x²), 1 − x).
    struct Rosenbrock;

    impl LeastSquaresProblem for Rosenbrock {
        fn param_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            2
        }

        fn residuals(&self, p: &[f64], out: &mut [f64]) {
            out[0] = 10.0 * (p[1] - p[0] * p[0]);
            out[1] = 1.0 - p[0];
        }
    }

    /// r = θ − target, one residual per parameter.
    struct Shift(Vec<f64>);

    impl LeastSquaresProblem for Shift {
        fn param_count(&self) -> usize {
            self.0.len()
        }

        fn residual_count(&self) -> usize {
            self.0.len()
        }

        fn residuals(&self, p: &[f64], out: &mut [f64]) {
            for i in 0..p.len() {
                out[i] = p[i] - self.0[i];
            }
        }

        fn jacobian(&self, _p: &[f64], out: &mut DMatrix<f64>) -> bool {
            out.fill_with_identity();
            true
        }
    }

    #[test]
    fn unbounded_rosenbrock_reaches_minimum() {
        let report = minimize(
            &Rosenbrock,
            &[-1.2, 1.0],
            &Bounds::unbounded(2),
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(report.method, SolverMethod::LevenbergMarquardt);
        assert!((report.params[0] - 1.0).abs() < 1e-6, "{:?}", report.params);
        assert!((report.params[1] - 1.0).abs() < 1e-6, "{:?}", report.params);
        assert!(report.sse < 1e-12);
    }

    #[test]
    fn bound_is_respected_and_becomes_active() {
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 10.0]).unwrap();
        let report = minimize(
            &Shift(vec![3.0, 2.0]),
            &[0.5, 0.5],
            &bounds,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(report.method, SolverMethod::BoundedLevenbergMarquardt);
        assert!(bounds.contains(&report.params));
        assert!((report.params[0] - 1.0).abs() < 1e-12);
        assert!((report.params[1] - 2.0).abs() < 1e-8);
    }

    #[test]
    fn fixed_parameter_never_moves() {
        let bounds = Bounds::new(vec![4.0, -5.0], vec![4.0, 5.0]).unwrap();
        let report = minimize(
            &Shift(vec![0.0, 1.0]),
            &[4.0, 0.0],
            &bounds,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(report.params[0], 4.0);
        assert!((report.params[1] - 1.0).abs() < 1e-8);
    }

    #[test]
    fn start_outside_box_is_projected() {
        let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();
        let report = minimize(&Shift(vec![0.5]), &[7.0], &bounds, &SolverOptions::default())
            .unwrap();
        assert!((report.params[0] - 0.5).abs() < 1e-8);
    }

    #[test]
    fn evaluation_cap_is_a_failure() {
        let options = SolverOptions {
            max_evaluations: 3,
            ..SolverOptions::default()
        };
        let err = minimize(&Rosenbrock, &[-1.2, 1.0], &Bounds::unbounded(2), &options).unwrap_err();
        assert!(matches!(err, SolverError::MaxEvaluations { .. }), "{err:?}");
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let err = Bounds::new(vec![1.0], vec![0.0]).unwrap_err();
        assert!(matches!(err, SolverError::InvalidBounds { index: 0, .. }));
        assert!(Bounds::new(vec![f64::NAN], vec![0.0]).is_err());
    }

    #[test]
    fn difference_step_stays_inside_box() {
        assert!(difference_step(1.0, 0.0, 1.0) < 0.0);
        assert!(difference_step(0.0, 0.0, 1.0) > 0.0);
        assert_eq!(difference_step(2.0, 2.0, 2.0), 0.0);
    }
}
