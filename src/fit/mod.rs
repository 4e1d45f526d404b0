//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit one catalog model to a record progression (`fit`)
//! - fit the whole catalog in parallel and select by R² (`analyze`)
//! - extrapolate with the selected model (`predict`)

pub mod fitter;
pub mod forecast;
pub mod selection;

pub use fitter::*;
pub use forecast::*;
pub use selection::*;
