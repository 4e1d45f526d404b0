//! Error types.
//!
//! The library reports failures as small, specific enums so callers can decide
//! what to skip and what to surface. The `rc` binary folds all of them into
//! [`AppError`], which only carries a process exit code and a message.

use thiserror::Error;

use crate::domain::ModelKind;

/// Binary-level error: an exit code plus a human-readable message.
///
/// Exit codes:
/// - `2` usage / input errors
/// - `3` insufficient data
/// - `4` numerical failures
#[derive(Clone, Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

/// Failures reported by the least-squares solver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid bounds for parameter {index}: [{lower}, {upper}]")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },

    #[error("residuals are not finite at the starting point")]
    NonFiniteStart,

    #[error("jacobian contains non-finite entries after {evaluations} evaluations")]
    NonFiniteJacobian { evaluations: usize },

    #[error("did not converge within {evaluations} function evaluations (sse={sse:.6e})")]
    MaxEvaluations { evaluations: usize, sse: f64 },
}

/// Why a single model could not be fitted to a series.
///
/// A failure only removes that model from the candidate set; the remaining
/// catalog entries are still fitted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("{model}: series contains non-finite values")]
    NonFiniteInput { model: ModelKind },

    #[error("{model}: underdetermined fit (n={n} < k={k})")]
    Underdetermined { model: ModelKind, n: usize, k: usize },

    #[error("{model}: {source}")]
    Solver {
        model: ModelKind,
        #[source]
        source: SolverError,
    },
}

impl FitFailure {
    pub fn model(&self) -> ModelKind {
        match self {
            FitFailure::NonFiniteInput { model }
            | FitFailure::Underdetermined { model, .. }
            | FitFailure::Solver { model, .. } => *model,
        }
    }
}

/// Series-level refusal to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("insufficient data: need at least {needed} records, got {got}")]
    InsufficientData { needed: usize, got: usize },
}

/// Why a forecast could not be produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("no model fitted successfully; nothing to extrapolate")]
    NoBestModel,

    /// The best model cannot be evaluated forward in elapsed time.
    #[error("prediction unavailable for model {model}")]
    Unavailable { model: ModelKind },

    #[error("invalid horizon {horizon}: must be finite and >= 0")]
    InvalidHorizon { horizon: f64 },

    #[error("model {model} produced a non-finite value at elapsed={elapsed}")]
    NonFinitePrediction { model: ModelKind, elapsed: f64 },
}

/// Invalid observation input (constructors and ingest).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series is empty")]
    Empty,

    #[error("record {index} is out of order: {detail}")]
    OutOfOrder { index: usize, detail: String },
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        AppError::new(3, err.to_string())
    }
}

impl From<FitFailure> for AppError {
    fn from(err: FitFailure) -> Self {
        AppError::new(4, err.to_string())
    }
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        AppError::new(4, err.to_string())
    }
}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        AppError::new(2, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_failure_reports_model() {
        let err = FitFailure::Underdetermined {
            model: ModelKind::Wright,
            n: 1,
            k: 2,
        };
        assert_eq!(err.model(), ModelKind::Wright);
        assert_eq!(err.to_string(), "wright: underdetermined fit (n=1 < k=2)");
    }

    #[test]
    fn insufficient_data_maps_to_exit_code_3() {
        let err: AppError = AnalysisError::InsufficientData { needed: 5, got: 3 }.into();
        assert_eq!(err.exit_code(), 3);
    }
}
