//! PWM waveform
//!
//! The worker re-arms a one-shot pulse on each channel at the start of
//! every cycle; the pulse length is the channel's high time. A counter in
//! NCO mode preloaded with `-high_ticks` produces exactly that: its
//! accumulator stays negative (bit 31 set) for `high_ticks` ticks.

use cogline_hal::CounterMode;

use super::Waveform;
use crate::error::{Error, Result};
use crate::pool::WorkerKind;

/// PWM timing for a fixed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmWave {
    cycle_us: u32,
    ticks_per_us: u32,
}

impl PwmWave {
    /// PWM with a cycle of `cycle_us` microseconds
    pub fn new(cycle_us: u32, ticks_per_second: u32) -> Result<Self> {
        let ticks_per_us = ticks_per_second / 1_000_000;
        if cycle_us == 0 || ticks_per_us == 0 {
            return Err(Error::InvalidArgument);
        }
        // Cycle must stay well inside half a counter wrap
        if u64::from(cycle_us) * u64::from(ticks_per_us) > u64::from(u32::MAX / 2) {
            return Err(Error::InvalidArgument);
        }
        Ok(Self {
            cycle_us,
            ticks_per_us,
        })
    }

    pub fn cycle_us(&self) -> u32 {
        self.cycle_us
    }

    /// High time in ticks for a high time in microseconds
    pub fn high_ticks(&self, high_us: u32) -> u32 {
        high_us.min(self.cycle_us) * self.ticks_per_us
    }
}

impl Waveform for PwmWave {
    const KIND: WorkerKind = WorkerKind::Pwm;
    const RETRIGGER: bool = true;

    fn period_ticks(&self) -> u32 {
        self.cycle_us * self.ticks_per_us
    }

    fn validate(&self, high_us: u32) -> Result<()> {
        if high_us > self.cycle_us {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    fn counter_mode(&self, high_us: u32) -> CounterMode {
        CounterMode::Pulse {
            high_ticks: self.high_ticks(high_us),
        }
    }
}
