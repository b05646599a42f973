//! Cogline Hardware Abstraction Layer
//!
//! This crate defines the platform traits the Cogline runtime needs from a
//! board: raw line registers, a free-running tick counter, per-worker
//! counter modules and a host able to run background worker tasks. Chip
//! or simulation crates implement them; `cogline-core` and
//! `cogline-drivers` only ever talk to these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  cogline-drivers (generators, timed I/O) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  cogline-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ cogline-hal-  │       │  chip HALs    │
//! │     sim       │       │  (external)   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::LineIo`] - Direction and output registers, input levels
//! - [`clock::TickClock`] - 32-bit system tick counter
//! - [`counter::CounterBank`] - Two counter modules per worker
//! - [`worker::WorkerHost`], [`worker::WorkerTask`] - Background execution

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod counter;
pub mod gpio;
pub mod serial;
pub mod shift;
pub mod worker;

// Re-export key traits at crate root for convenience
pub use clock::TickClock;
pub use counter::{CounterBank, CounterMode, CounterSlot};
pub use gpio::{Direction, Level, Line, LineIo, LINE_COUNT};
pub use serial::{SerialConfig, SerialMode};
pub use shift::{BitOrder, SampleEdge, ShiftInMode};
pub use worker::{LaunchError, WorkerHost, WorkerId, WorkerTask, MAX_WORKERS};

/// Everything the runtime needs from a board
///
/// Implemented automatically for any cloneable, thread-safe handle that
/// provides all four platform traits.
pub trait Platform:
    LineIo + TickClock + CounterBank + WorkerHost + Clone + Send + Sync + 'static
{
}

// Blanket implementation
impl<T> Platform for T where
    T: LineIo + TickClock + CounterBank + WorkerHost + Clone + Send + Sync + 'static
{
}
