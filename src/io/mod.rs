//! Input handling.
//!
//! - `ingest`: read a record progression from CSV

pub mod ingest;

pub use ingest::*;
