//! Cogline runtime
//!
//! Ties the platform traits from `cogline-hal` and the board-agnostic
//! state from `cogline-core` into a usable runtime:
//!
//! - [`Cogline`] - one runtime per board: registry, pool, time base
//! - [`generator`] - PWM, DAC and square-wave families on workers
//! - [`timed`] - pulse measurement, RC decay, transition counting, shifting
//! - [`stream`] - half-duplex, full-duplex and bus byte streams
//! - [`simple`] - flat calls with signed pins and plain integers
//! - [`config`] - TOML configuration loading

#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod generator;
pub mod runtime;
pub mod simple;
pub mod stream;
pub mod timed;

#[cfg(feature = "sim")]
pub mod sim;

pub use cogline_core::{CoglineConfig, Error, Result};
pub use generator::Generator;
pub use runtime::Cogline;
pub use simple::Simple;
pub use stream::{Bus, FullDuplex, HalfDuplex, Stream};
