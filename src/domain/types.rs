//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - handed to downstream reporting as plain JSON
//! - compared across runs

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;
use crate::math::{SolverMethod, SolverOptions, Termination};

/// Minimum number of records `analyze` accepts.
pub const MIN_SAMPLES: usize = 5;

/// Default forecast horizons (days beyond the last record).
pub const DEFAULT_HORIZONS: [f64; 5] = [30.0, 90.0, 180.0, 365.0, 730.0];

/// Best R² above which a series counts as well explained.
pub const GOOD_FIT_R_SQUARED: f64 = 0.7;

/// One record-breaking measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Time since the first record (days for date-based input).
    pub elapsed: f64,
    pub value: f64,
}

/// A record progression: strictly improving values ordered by `elapsed`.
///
/// Ordering and monotonicity are the producer's responsibility; the fitting
/// code only reads the series and never modifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    observations: Vec<Observation>,
}

impl ObservationSeries {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(elapsed, value)| Observation { elapsed, value })
                .collect(),
        )
    }

    /// Build a series from dated records, measuring elapsed days from the first date.
    pub fn from_dates(records: &[(NaiveDate, f64)]) -> Result<Self, SeriesError> {
        let Some(&(first_date, _)) = records.first() else {
            return Err(SeriesError::Empty);
        };

        let mut observations = Vec::with_capacity(records.len());
        let mut prev = first_date;
        for (index, &(date, value)) in records.iter().enumerate() {
            if index > 0 && date < prev {
                return Err(SeriesError::OutOfOrder {
                    index,
                    detail: format!("{date} precedes {prev}"),
                });
            }
            prev = date;
            let elapsed = (date - first_date).num_days() as f64;
            observations.push(Observation { elapsed, value });
        }
        Ok(Self::new(observations))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn elapsed(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.elapsed).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// 1-based record numbers `1..=n`.
    pub fn record_indices(&self) -> Vec<f64> {
        (1..=self.observations.len()).map(|i| i as f64).collect()
    }

    /// The first (worst) record.
    pub fn first_value(&self) -> Option<f64> {
        self.observations.first().map(|o| o.value)
    }

    /// The latest (best) record.
    pub fn current_value(&self) -> Option<f64> {
        self.observations.last().map(|o| o.value)
    }

    pub fn last_elapsed(&self) -> Option<f64> {
        self.observations.last().map(|o| o.elapsed)
    }
}

/// Which quantity a model uses as its independent variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndependentVariable {
    /// Time since the first record.
    Elapsed,
    /// 1-based position in the record progression.
    RecordIndex,
}

/// Candidate decay model.
///
/// Declaration order is the catalog order, which also breaks exact R² ties.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `a·e^(−b·x) + c`
    Exponential,
    /// `a·(x+1)^(−b) + c`
    #[value(name = "power_law")]
    PowerLaw,
    /// `a / (1 + b·ln(x+1)) + c`
    Logarithmic,
    /// `a / (1 + b·x) + c`
    Hyperbolic,
    /// Wright's learning curve `T₁·n^b` over record index `n`.
    Wright,
}

impl ModelKind {
    /// The full catalog in declaration order.
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Exponential,
        ModelKind::PowerLaw,
        ModelKind::Logarithmic,
        ModelKind::Hyperbolic,
        ModelKind::Wright,
    ];

    /// Stable machine name (matches the serde representation).
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Exponential => "exponential",
            ModelKind::PowerLaw => "power_law",
            ModelKind::Logarithmic => "logarithmic",
            ModelKind::Hyperbolic => "hyperbolic",
            ModelKind::Wright => "wright",
        }
    }

    /// Human-readable label.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Exponential => "Exponential decay",
            ModelKind::PowerLaw => "Power law",
            ModelKind::Logarithmic => "Logarithmic decay",
            ModelKind::Hyperbolic => "Hyperbolic",
            ModelKind::Wright => "Wright learning curve",
        }
    }

    pub fn param_count(self) -> usize {
        self.parameter_names().len()
    }

    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Exponential
            | ModelKind::PowerLaw
            | ModelKind::Logarithmic
            | ModelKind::Hyperbolic => &["a", "b", "c"],
            ModelKind::Wright => &["t1", "b"],
        }
    }

    pub fn independent_variable(self) -> IndependentVariable {
        match self {
            ModelKind::Wright => IndependentVariable::RecordIndex,
            _ => IndependentVariable::Elapsed,
        }
    }

    /// Whether the last parameter is an asymptote that can be read as a
    /// theoretical limit.
    ///
    /// The logarithmic offset is bounded like an asymptote but the curve never
    /// settles onto it on any practical horizon, so it is not reported.
    pub fn has_asymptote(self) -> bool {
        matches!(
            self,
            ModelKind::Exponential | ModelKind::PowerLaw | ModelKind::Hyperbolic
        )
    }

    /// Whether the model can be evaluated beyond the last observed elapsed time.
    pub fn is_forward_evaluable(self) -> bool {
        self.independent_variable() == IndependentVariable::Elapsed
    }

    /// Catalog position, used for deterministic ordering.
    pub fn catalog_index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub r_squared: f64,
    /// Informational only; selection uses `r_squared`.
    pub aic: f64,
    pub n: usize,
}

/// How the solver run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSummary {
    pub method: SolverMethod,
    pub termination: Termination,
    pub evaluations: usize,
    pub iterations: usize,
}

/// Successful fit of one model to one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: ModelKind,
    pub params: Vec<f64>,
    pub quality: FitQuality,
    pub solver: SolverSummary,
}

impl FitResult {
    /// Fitted asymptote `c` for models that have one.
    pub fn asymptote(&self) -> Option<f64> {
        if self.model.has_asymptote() {
            self.params.last().copied()
        } else {
            None
        }
    }

    /// Wright learning rate `2^b`: the fraction of time kept per doubling of
    /// the record count (0.8 means an "80% learning curve").
    pub fn learning_rate(&self) -> Option<f64> {
        match self.model {
            ModelKind::Wright => self.params.get(1).map(|b| 2f64.powf(*b)),
            _ => None,
        }
    }
}

/// A model that could not be fitted, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: ModelKind,
    pub message: String,
}

/// Headline numbers of the analyzed progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub n_records: usize,
    pub first_value: f64,
    pub current_value: f64,
    /// `(1 − current/first)·100`; absent when the first value is zero.
    pub improvement_percent: Option<f64>,
    /// Elapsed value of the latest record; forecasts are offset from here.
    pub last_elapsed: f64,
    pub elapsed_span: f64,
}

/// One extrapolated point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Offset beyond the last observed elapsed value.
    pub horizon: f64,
    /// Absolute elapsed value the model was evaluated at.
    pub elapsed: f64,
    pub predicted_value: f64,
    /// `current_value − predicted_value`.
    pub improvement: f64,
}

/// Asymptotic limit read off the fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitEstimate {
    pub theoretical_limit: f64,
    /// How much of the original gap to the limit is still left, in percent.
    ///
    /// `None` when the first record sits exactly on the limit.
    pub percent_to_limit: Option<f64>,
}

/// Extrapolation with the best model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub model: ModelKind,
    pub predictions: Vec<Prediction>,
    pub limit: Option<LimitEstimate>,
}

/// All fits for one series plus the selection outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: SeriesSummary,
    /// Successful fits, in catalog order.
    pub fits: Vec<FitResult>,
    pub failures: Vec<ModelFailure>,
    pub best_model: Option<ModelKind>,
    pub best_r_squared: Option<f64>,
    pub forecast: Option<Forecast>,
    /// Why `forecast` is absent although horizons were requested.
    pub forecast_error: Option<String>,
}

impl AnalysisResult {
    pub fn best(&self) -> Option<&FitResult> {
        let best = self.best_model?;
        self.fits.iter().find(|f| f.model == best)
    }

    pub fn fit_for(&self, model: ModelKind) -> Option<&FitResult> {
        self.fits.iter().find(|f| f.model == model)
    }

    pub fn is_good_fit(&self) -> bool {
        self.best_r_squared
            .is_some_and(|r2| r2 > GOOD_FIT_R_SQUARED)
    }
}

/// Knobs for a single analysis run.
///
/// Derived from CLI flags in the binary; `Default` matches the documented
/// behaviour of `fit`/`analyze`.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub min_samples: usize,
    pub solver: SolverOptions,
    /// When set, `analyze_with` also extrapolates at these horizons.
    pub horizons: Option<Vec<f64>>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_samples: MIN_SAMPLES,
            solver: SolverOptions::default(),
            horizons: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_is_declaration_order() {
        for (i, kind) in ModelKind::ALL.iter().enumerate() {
            assert_eq!(kind.catalog_index(), i);
        }
    }

    #[test]
    fn from_dates_measures_days_since_first() {
        let d = |m, day| NaiveDate::from_ymd_opt(2020, m, day).unwrap();
        let series =
            ObservationSeries::from_dates(&[(d(1, 1), 100.0), (d(1, 11), 90.0), (d(2, 1), 85.0)])
                .unwrap();
        assert_eq!(series.elapsed(), vec![0.0, 10.0, 31.0]);
        assert_eq!(series.record_indices(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn from_dates_rejects_unsorted_input() {
        let d = |day| NaiveDate::from_ymd_opt(2020, 1, day).unwrap();
        let err = ObservationSeries::from_dates(&[(d(5), 10.0), (d(2), 9.0)]).unwrap_err();
        assert!(matches!(err, SeriesError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn wright_learning_rate_is_two_to_the_b() {
        let fit = FitResult {
            model: ModelKind::Wright,
            params: vec![100.0, -0.322],
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                r_squared: 1.0,
                aic: 0.0,
                n: 5,
            },
            solver: SolverSummary {
                method: SolverMethod::BoundedLevenbergMarquardt,
                termination: Termination::CostTolerance,
                evaluations: 1,
                iterations: 1,
            },
        };
        let rate = fit.learning_rate().unwrap();
        assert!((rate - 0.8).abs() < 1e-3, "rate={rate}");
        assert_eq!(fit.asymptote(), None);
    }

    #[test]
    fn model_names_match_serde() {
        for kind in ModelKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }
}
