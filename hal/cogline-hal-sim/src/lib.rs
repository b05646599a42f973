//! Host simulation board for Cogline
//!
//! Implements the `cogline-hal` traits on a desktop host:
//!
//! - Line registers live behind a mutex; counter outputs are computed from
//!   the tick at which a line is read
//! - The tick counter follows the host monotonic clock at 80 MHz
//! - Each worker runs its task on a dedicated OS thread
//! - [`Device`]s attached to the board drive input lines, standing in for
//!   the circuit outside the chip
//!
//! ```ignore
//! let board = SimBoard::new();
//! board.attach(Wire::new(tx, rx));
//! let cog = Cogline::with_defaults(board.clone());
//! ```

#![deny(unsafe_code)]

mod board;
mod clock;
pub mod device;
mod worker;

pub use board::{Pins, SimBoard};
pub use clock::SimClock;
pub use device::{ClockSource, Device, PulseSource, RcDecay, ShiftEcho, Wire};

/// Default simulated system clock
pub const SIM_CLOCK_HZ: u32 = 80_000_000;
