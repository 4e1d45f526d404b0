//! Decay model catalog.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic over `ModelKind`.

pub mod catalog;
pub mod model;

pub use catalog::*;
pub use model::*;
