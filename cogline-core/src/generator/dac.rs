//! Duty-modulated D/A waveform
//!
//! A counter in duty single-ended mode outputs its accumulator carry,
//! which is high for `frq / 2^32` of all ticks. Scaling a `bits`-wide
//! code up to the full 32-bit word makes the average output
//! `code / 2^bits` of the supply voltage once filtered.

use cogline_hal::CounterMode;

use super::Waveform;
use crate::config::{DacConfig, MAX_DAC_BITS};
use crate::error::{Error, Result};
use crate::pool::WorkerKind;

/// DAC resolution and worker polling period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DacWave {
    bits: u8,
    period_ticks: u32,
}

impl DacWave {
    pub fn new(config: &DacConfig, ticks_per_second: u32) -> Result<Self> {
        config.validate()?;
        let per_us = (ticks_per_second / 1_000_000).max(1);
        let period_ticks = config
            .update_period_us
            .checked_mul(per_us)
            .filter(|ticks| *ticks <= u32::MAX / 2)
            .ok_or(Error::InvalidArgument)?;
        Ok(Self {
            bits: config.resolution_bits,
            period_ticks,
        })
    }

    pub fn resolution_bits(&self) -> u8 {
        self.bits
    }

    /// Number of distinct codes (2^bits)
    pub fn levels(&self) -> u64 {
        1u64 << self.bits
    }

    /// Frequency word for a code
    pub fn frq(&self, code: u32) -> u32 {
        debug_assert!(self.bits <= MAX_DAC_BITS);
        code << (32 - u32::from(self.bits))
    }
}

impl Waveform for DacWave {
    const KIND: WorkerKind = WorkerKind::Dac;

    fn period_ticks(&self) -> u32 {
        self.period_ticks
    }

    fn validate(&self, code: u32) -> Result<()> {
        if u64::from(code) >= self.levels() {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    fn counter_mode(&self, code: u32) -> CounterMode {
        CounterMode::DutySingleEnded {
            frq: self.frq(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dac(bits: u8) -> DacWave {
        let config = DacConfig {
            resolution_bits: bits,
            ..DacConfig::default()
        };
        DacWave::new(&config, 80_000_000).unwrap()
    }

    #[test]
    fn test_eight_bit_codes() {
        let dac = dac(8);
        assert_eq!(dac.validate(255), Ok(()));
        assert_eq!(dac.validate(256), Err(Error::InvalidArgument));
        // Half scale
        assert_eq!(dac.frq(128), 0x8000_0000);
        assert_eq!(
            dac.counter_mode(64),
            CounterMode::DutySingleEnded { frq: 0x4000_0000 }
        );
    }

    #[test]
    fn test_resolution_changes_scale() {
        let dac = dac(10);
        assert_eq!(dac.levels(), 1024);
        assert_eq!(dac.frq(512), 0x8000_0000);
        assert_eq!(dac.validate(1023), Ok(()));
    }

    #[test]
    fn test_period_from_config() {
        assert_eq!(dac(8).period_ticks(), 80_000);
    }
}
