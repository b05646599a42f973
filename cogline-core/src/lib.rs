//! Board-agnostic core logic for the Cogline runtime
//!
//! This crate holds everything that does not depend on how background
//! work is actually executed:
//!
//! - Error taxonomy and configuration types
//! - Shared time base (units, mark/timeout/wait, timeout windows)
//! - Line ownership registry
//! - Worker pool
//! - Generator state machine, channel bank and waveform math
//! - Bit assembly for synchronous shift transfers

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod error;
pub mod generator;
pub mod pool;
pub mod registry;
pub mod shift;
pub mod time;

pub use config::CoglineConfig;
pub use error::{Error, Result};
pub use pool::{WorkerKind, WorkerPool, WorkerState};
pub use registry::{Claimant, DriverId, LineRegistry, LineSnapshot, ReleasePolicy};
pub use time::{Deadline, TimeBase, Unit};
