//! Counter modules
//!
//! Every worker owns two counter modules (A and B). A counter adds its
//! frequency word to a 32-bit phase accumulator on every system tick and
//! drives one line from the accumulator, which lets a worker produce
//! signals far faster than it could toggle a line itself. Signal
//! generators use one counter per channel.

use crate::gpio::Line;
use crate::worker::WorkerId;

/// Counter module selector within a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterSlot {
    A,
    B,
}

impl CounterSlot {
    /// Counter used by a generator channel (0 → A, 1 → B)
    pub const fn for_channel(channel: usize) -> Option<Self> {
        match channel {
            0 => Some(CounterSlot::A),
            1 => Some(CounterSlot::B),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            CounterSlot::A => 0,
            CounterSlot::B => 1,
        }
    }
}

/// Counter operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CounterMode {
    /// Counter disabled, drives nothing
    Off,
    /// Numerically controlled oscillator: output is accumulator bit 31,
    /// a square wave at `frq * clk / 2^32`
    Nco { frq: u32 },
    /// NCO feeding the PLL: the VCO runs at 16x the NCO frequency and the
    /// output is the VCO divided by `2^(7 - divider)`
    Pll { frq: u32, divider: u8 },
    /// Duty single-ended: output is the accumulator carry, high for
    /// `frq / 2^32` of all ticks on average
    DutySingleEnded { frq: u32 },
    /// One-shot high pulse of `high_ticks` starting when configured
    Pulse { high_ticks: u32 },
}

impl CounterMode {
    pub const fn is_off(&self) -> bool {
        matches!(self, CounterMode::Off)
    }
}

/// Access to the counter modules of every worker
pub trait CounterBank {
    /// Configure one counter of `worker` to drive `line`
    ///
    /// Reconfiguring a counter that drives a different line moves it; the
    /// previous line is no longer driven by the counter.
    fn configure(&self, worker: WorkerId, slot: CounterSlot, line: Line, mode: CounterMode);

    /// Disable one counter of `worker`
    fn disable(&self, worker: WorkerId, slot: CounterSlot);

    /// Disable both counters of `worker`
    fn disable_all(&self, worker: WorkerId) {
        self.disable(worker, CounterSlot::A);
        self.disable(worker, CounterSlot::B);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_mapping() {
        assert_eq!(CounterSlot::for_channel(0), Some(CounterSlot::A));
        assert_eq!(CounterSlot::for_channel(1), Some(CounterSlot::B));
        assert_eq!(CounterSlot::for_channel(2), None);
        assert_eq!(CounterSlot::B.index(), 1);
    }
}
