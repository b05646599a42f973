//! Configuration type definitions

use cogline_hal::MAX_WORKERS;

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest DAC resolution in bits
pub const MAX_DAC_BITS: u8 = 31;

/// Largest full-duplex receive buffer in bytes
pub const MAX_RX_BUFFER: usize = 256;

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoglineConfig {
    pub timing: TimingConfig,
    pub pool: PoolConfig,
    pub pwm: PwmConfig,
    pub dac: DacConfig,
    pub square_wave: SquareWaveConfig,
    pub serial: SerialDefaults,
}

impl CoglineConfig {
    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        self.pool.validate()?;
        self.pwm.validate()?;
        self.dac.validate()?;
        self.square_wave.validate()?;
        self.serial.validate()
    }
}

/// Time base defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimingConfig {
    /// Length of one `pause` unit in microseconds
    pub pause_unit_us: u32,
    /// Length of one timed-I/O unit in microseconds
    pub io_unit_us: u32,
    /// Length of one transition-count unit in microseconds
    pub count_unit_us: u32,
    /// Timed-I/O timeout ceiling in milliseconds (0 = no timeout)
    pub io_timeout_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pause_unit_us: 1_000,
            io_unit_us: 1,
            count_unit_us: 1,
            io_timeout_ms: 250,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pause_unit_us == 0 || self.io_unit_us == 0 || self.count_unit_us == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Background workers available (the foreground unit is not counted)
    pub workers: u8,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: (MAX_WORKERS - 1) as u8,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if usize::from(self.workers) >= MAX_WORKERS {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}

/// PWM generator defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PwmConfig {
    /// PWM cycle in microseconds
    pub cycle_us: u32,
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self { cycle_us: 1_000 }
    }
}

impl PwmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cycle_us == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}

/// Duty-modulated DAC defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DacConfig {
    /// Resolution in bits; codes run from 0 to 2^bits - 1
    pub resolution_bits: u8,
    /// How often the worker polls for channel updates, in microseconds
    pub update_period_us: u32,
}

impl Default for DacConfig {
    fn default() -> Self {
        Self {
            resolution_bits: 8,
            update_period_us: 1_000,
        }
    }
}

impl DacConfig {
    pub fn validate(&self) -> Result<()> {
        if self.resolution_bits == 0 || self.resolution_bits > MAX_DAC_BITS {
            return Err(Error::InvalidArgument);
        }
        if self.update_period_us == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}

/// Square-wave generator defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SquareWaveConfig {
    /// How often the worker polls for channel updates, in microseconds
    pub update_period_us: u32,
}

impl Default for SquareWaveConfig {
    fn default() -> Self {
        Self {
            update_period_us: 1_000,
        }
    }
}

impl SquareWaveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.update_period_us == 0 {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}

/// Serial driver defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SerialDefaults {
    /// Full-duplex receive buffer size in bytes
    pub rx_buffer: usize,
}

impl Default for SerialDefaults {
    fn default() -> Self {
        Self { rx_buffer: 64 }
    }
}

impl SerialDefaults {
    pub fn validate(&self) -> Result<()> {
        if self.rx_buffer == 0 || self.rx_buffer > MAX_RX_BUFFER {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(CoglineConfig::default().validate(), Ok(()));
        assert_eq!(PoolConfig::default().workers, 7);
        assert_eq!(DacConfig::default().resolution_bits, 8);
    }

    #[test]
    fn test_rejects_zero_units() {
        let mut cfg = CoglineConfig::default();
        cfg.timing.io_unit_us = 0;
        assert_eq!(cfg.validate(), Err(Error::InvalidArgument));
    }

    #[test]
    fn test_rejects_oversized_pool() {
        let cfg = PoolConfig { workers: 8 };
        assert_eq!(cfg.validate(), Err(Error::InvalidArgument));
    }

    #[test]
    fn test_dac_bit_range() {
        let mut cfg = DacConfig::default();
        cfg.resolution_bits = 32;
        assert_eq!(cfg.validate(), Err(Error::InvalidArgument));
        cfg.resolution_bits = 1;
        assert_eq!(cfg.validate(), Ok(()));
    }
}
