//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the input record progression (`ObservationSeries`)
//! - the model catalog enum (`ModelKind`)
//! - fit and analysis outputs (`FitResult`, `AnalysisResult`, `Forecast`, etc.)

pub mod types;

pub use types::*;
