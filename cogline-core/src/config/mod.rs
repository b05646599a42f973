//! Configuration types
//!
//! Board-agnostic runtime settings. Units are wall-clock quantities; they
//! are converted to ticks once the board's clock rate is known.

pub mod types;

pub use types::*;
