//! `record-curves` library crate.
//!
//! Fits a small catalog of decay models to a record progression (a series of
//! successively better results), selects the best by R², and extrapolates.
//!
//! The binary (`rc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the engine can be embedded without the CLI

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
