//! End-to-end properties of the fit & select engine.

use proptest::prelude::*;

use record_curves::data::{SampleConfig, generate_progression};
use record_curves::domain::{AnalysisConfig, ModelKind, ObservationSeries};
use record_curves::error::{FitFailure, PredictionError};
use record_curves::fit::{R_SQUARED_TIE_TOLERANCE, analyze, analyze_with, fit, predict};

/// Strictly improving progressions with 5..12 records.
fn progression() -> impl Strategy<Value = ObservationSeries> {
    (
        50.0f64..500.0,
        prop::collection::vec((1.0f64..60.0, 0.001f64..0.08), 4..11),
    )
        .prop_map(|(first, steps)| {
            let mut pairs = vec![(0.0, first)];
            let (mut elapsed, mut value) = (0.0, first);
            for (gap, drop) in steps {
                elapsed += gap;
                value *= 1.0 - drop;
                pairs.push((elapsed, value));
            }
            ObservationSeries::from_pairs(&pairs)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn analysis_leaves_input_untouched_and_is_repeatable(series in progression()) {
        let before = series.clone();
        let first = analyze(&series).unwrap();
        prop_assert_eq!(&series, &before);

        let second = analyze(&series).unwrap();
        prop_assert_eq!(&first, &second);
    }

    #[test]
    fn best_model_has_the_highest_r_squared(series in progression()) {
        let result = analyze(&series).unwrap();
        prop_assert_eq!(result.fits.len() + result.failures.len(), ModelKind::ALL.len());

        if let Some(best) = result.best() {
            for fit in &result.fits {
                prop_assert!(fit.quality.r_squared <= best.quality.r_squared + R_SQUARED_TIE_TOLERANCE);
                // Earlier catalog entries never tie with a later winner.
                if fit.model.catalog_index() < best.model.catalog_index() {
                    prop_assert!(fit.quality.r_squared < best.quality.r_squared);
                }
            }
        }
    }

    #[test]
    fn fitted_parameters_respect_bounds(series in progression()) {
        let y0 = series.first_value().unwrap();
        let result = analyze(&series).unwrap();
        for fit in &result.fits {
            match fit.model {
                ModelKind::Wright => {
                    prop_assert!(fit.params[0] >= 0.0);
                    prop_assert!((-2.0..=0.0).contains(&fit.params[1]));
                }
                _ => {
                    prop_assert!(fit.params.iter().all(|p| *p >= 0.0));
                    prop_assert!(fit.params[2] <= y0);
                }
            }
        }
    }
}

#[test]
fn fewer_points_than_parameters_fails_that_model_only() {
    let series = ObservationSeries::from_pairs(&[(0.0, 12.0), (3.0, 11.0)]);
    for model in ModelKind::ALL {
        let outcome = fit(&series, model);
        if model.param_count() > series.len() {
            assert!(
                matches!(outcome, Err(FitFailure::Underdetermined { n: 2, k: 3, .. })),
                "{model}: {outcome:?}"
            );
        } else {
            assert!(outcome.is_ok(), "{model}: {outcome:?}");
        }
    }
}

#[test]
fn constant_series_scores_zero_everywhere() {
    let series = ObservationSeries::from_pairs(&[
        (0.0, 42.0),
        (5.0, 42.0),
        (9.0, 42.0),
        (20.0, 42.0),
        (31.0, 42.0),
        (40.0, 42.0),
    ]);
    let result = analyze(&series).unwrap();
    assert!(!result.fits.is_empty());
    for fit in &result.fits {
        assert_eq!(fit.quality.r_squared, 0.0, "{}", fit.model);
    }
    assert_eq!(result.best_model, Some(ModelKind::Exponential));
}

#[test]
fn wright_progression_has_no_time_forecast() {
    let sample = generate_progression(&SampleConfig {
        model: ModelKind::Wright,
        noise_sd: 0.0,
        ..SampleConfig::default()
    })
    .unwrap();
    let config = AnalysisConfig {
        horizons: Some(vec![30.0, 365.0]),
        ..AnalysisConfig::default()
    };
    let result = analyze_with(&sample.series, &config).unwrap();

    assert_eq!(result.best_model, Some(ModelKind::Wright));
    assert!(result.forecast.is_none());
    assert!(result.forecast_error.is_some());
    assert_eq!(
        predict(&result, &[30.0]).unwrap_err(),
        PredictionError::Unavailable {
            model: ModelKind::Wright
        }
    );

    let best = result.best().unwrap();
    let rate = best.learning_rate().unwrap();
    assert!((rate - 2f64.powf(-0.15)).abs() < 1e-6, "rate={rate}");
}

#[test]
fn noisy_samples_are_well_explained() {
    for model in [ModelKind::Exponential, ModelKind::Hyperbolic] {
        let sample = generate_progression(&SampleConfig {
            model,
            noise_sd: 0.002,
            seed: 11,
            ..SampleConfig::default()
        })
        .unwrap();
        let result = analyze(&sample.series).unwrap();
        assert!(result.is_good_fit(), "{model}: {result:#?}");
    }
}
