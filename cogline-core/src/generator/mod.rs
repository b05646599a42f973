//! Background signal generators
//!
//! A generator family (PWM, duty-modulated DAC, square wave) runs on one
//! worker and multiplexes up to two channels onto that worker's counter
//! modules. This module holds the pieces that do not depend on how the
//! worker is executed:
//!
//! - [`GeneratorState`] - family lifecycle
//! - [`ChannelBank`] - requested vs applied channel settings, the only
//!   structure shared between the caller and the worker
//! - [`Waveform`] - per-family parameter validation and counter setup

pub mod dac;
pub mod pwm;
pub mod square;

use cogline_hal::{CounterMode, Line};

use crate::error::{Error, Result};
use crate::pool::WorkerKind;

pub use dac::DacWave;
pub use pwm::PwmWave;
pub use square::SquareWave;

/// Channels per generator (one per counter module)
pub const CHANNELS: usize = 2;

/// Generator family lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeneratorState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl GeneratorState {
    pub const fn is_running(self) -> bool {
        matches!(self, GeneratorState::Running)
    }
}

/// One channel's line binding and live parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelSetting {
    /// Bound line, `None` when the channel is idle
    pub line: Option<Line>,
    /// High time in µs, DAC code or frequency in Hz, depending on family
    pub param: u32,
}

impl ChannelSetting {
    pub const IDLE: ChannelSetting = ChannelSetting {
        line: None,
        param: 0,
    };

    pub const fn new(line: Option<Line>, param: u32) -> Self {
        Self { line, param }
    }

    /// A bound channel is an enabled channel
    pub const fn is_enabled(&self) -> bool {
        self.line.is_some()
    }
}

/// Channel settings shared between the caller and the worker
///
/// The caller writes requests; the worker applies them at the start of
/// its next period and records what it applied. Last request wins.
#[derive(Debug, Clone, Default)]
pub struct ChannelBank {
    requested: [ChannelSetting; CHANNELS],
    applied: [ChannelSetting; CHANNELS],
    updates: [u32; CHANNELS],
}

impl ChannelBank {
    pub const fn new() -> Self {
        Self {
            requested: [ChannelSetting::IDLE; CHANNELS],
            applied: [ChannelSetting::IDLE; CHANNELS],
            updates: [0; CHANNELS],
        }
    }

    /// Validate a channel index
    pub fn check_channel(channel: usize) -> Result<()> {
        if channel < CHANNELS {
            Ok(())
        } else {
            Err(Error::InvalidArgument)
        }
    }

    /// Queue a new setting for `channel`
    pub fn request(&mut self, channel: usize, setting: ChannelSetting) {
        self.requested[channel] = setting;
        self.updates[channel] = self.updates[channel].wrapping_add(1);
    }

    pub fn requested(&self, channel: usize) -> ChannelSetting {
        self.requested[channel]
    }

    pub fn applied(&self, channel: usize) -> ChannelSetting {
        self.applied[channel]
    }

    /// Number of requests made on `channel` so far
    pub fn updates(&self, channel: usize) -> u32 {
        self.updates[channel]
    }

    /// Whether `channel` has a request the worker has not applied yet
    pub fn is_pending(&self, channel: usize) -> bool {
        self.requested[channel] != self.applied[channel]
    }

    /// Record that the worker applied the current request
    pub fn mark_applied(&mut self, channel: usize) {
        self.applied[channel] = self.requested[channel];
    }

    /// Whether a channel other than `channel` is bound to `line`
    pub fn bound_elsewhere(&self, channel: usize, line: Line) -> bool {
        (0..CHANNELS)
            .filter(|other| *other != channel)
            .any(|other| self.requested[other].line == Some(line))
    }

    /// Drop every binding, returning the lines that were requested
    pub fn clear(&mut self) -> [Option<Line>; CHANNELS] {
        let lines = [self.requested[0].line, self.requested[1].line];
        *self = Self::new();
        lines
    }
}

/// Family-specific behaviour of a generator
pub trait Waveform: Copy + Send + Sync + 'static {
    /// Worker kind allocated for this family
    const KIND: WorkerKind;

    /// Whether the counter setting must be re-issued every period
    /// (one-shot pulses) rather than only when a channel changes
    const RETRIGGER: bool = false;

    /// Worker period in ticks
    fn period_ticks(&self) -> u32;

    /// Check a channel parameter against the family's domain
    fn validate(&self, param: u32) -> Result<()>;

    /// Counter setup producing `param`
    fn counter_mode(&self, param: u32) -> CounterMode;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(i: u8) -> Line {
        Line::new(i).unwrap()
    }

    #[test]
    fn test_request_and_apply() {
        let mut bank = ChannelBank::new();
        assert!(!bank.is_pending(0));

        bank.request(0, ChannelSetting::new(Some(line(3)), 500));
        assert!(bank.is_pending(0));
        assert_eq!(bank.updates(0), 1);

        bank.mark_applied(0);
        assert!(!bank.is_pending(0));
        assert_eq!(bank.applied(0).line, Some(line(3)));
    }

    #[test]
    fn test_last_request_wins() {
        let mut bank = ChannelBank::new();
        for duty in 0..10 {
            bank.request(1, ChannelSetting::new(Some(line(duty as u8)), duty));
        }
        bank.mark_applied(1);
        assert_eq!(bank.applied(1), ChannelSetting::new(Some(line(9)), 9));
    }

    #[test]
    fn test_bound_elsewhere() {
        let mut bank = ChannelBank::new();
        bank.request(0, ChannelSetting::new(Some(line(5)), 1));
        assert!(bank.bound_elsewhere(1, line(5)));
        assert!(!bank.bound_elsewhere(0, line(5)));
        assert!(!bank.bound_elsewhere(1, line(6)));
    }

    #[test]
    fn test_clear_returns_lines() {
        let mut bank = ChannelBank::new();
        bank.request(1, ChannelSetting::new(Some(line(2)), 1));
        assert_eq!(bank.clear(), [None, Some(line(2))]);
        assert_eq!(bank.requested(1), ChannelSetting::IDLE);
    }

    #[test]
    fn test_channel_index() {
        assert!(ChannelBank::check_channel(1).is_ok());
        assert_eq!(ChannelBank::check_channel(2), Err(Error::InvalidArgument));
    }
}
