//! Simulated circuits attached to the lines
//!
//! A device only ever drives lines the chip leaves as inputs. When several
//! devices drive the same line, the first one attached wins.

use std::collections::VecDeque;

use cogline_hal::clock::reached;
use cogline_hal::{Level, Line};

use crate::board::Pins;

/// Circuit outside the chip
pub trait Device: Send {
    /// Level applied to input `line`, `None` when not connected to it
    fn drive(&self, line: Line, pins: &Pins<'_>) -> Option<Level>;

    /// Observe the chip side after any register write
    fn on_change(&mut self, _pins: &Pins<'_>) {}
}

/// Connects an output of the chip to another line
///
/// Reads low while `from` is not driven, like an idle pull-down.
#[derive(Debug, Clone, Copy)]
pub struct Wire {
    from: Line,
    to: Line,
}

impl Wire {
    pub fn new(from: Line, to: Line) -> Self {
        Self { from, to }
    }
}

impl Device for Wire {
    fn drive(&self, line: Line, pins: &Pins<'_>) -> Option<Level> {
        (line == self.to).then(|| pins.driven(self.from).unwrap_or(Level::Low))
    }
}

/// Shift register on a clock and data line pair
///
/// While the chip drives `data`, each rising clock edge captures a bit.
/// While `data` is an input, the oldest captured bit is presented on it and
/// each rising edge moves on to the next one. Captured bits are therefore
/// echoed back in the order they arrived.
#[derive(Debug)]
pub struct ShiftEcho {
    data: Line,
    clock: Line,
    bits: VecDeque<bool>,
    last_clock: Level,
}

impl ShiftEcho {
    pub fn new(data: Line, clock: Line) -> Self {
        Self {
            data,
            clock,
            bits: VecDeque::new(),
            last_clock: Level::Low,
        }
    }

    /// Device preloaded with bits to present
    pub fn with_bits(data: Line, clock: Line, bits: impl IntoIterator<Item = bool>) -> Self {
        Self {
            bits: bits.into_iter().collect(),
            ..Self::new(data, clock)
        }
    }
}

impl Device for ShiftEcho {
    fn drive(&self, line: Line, _pins: &Pins<'_>) -> Option<Level> {
        if line != self.data {
            return None;
        }
        Some(Level::from(self.bits.front().copied().unwrap_or(false)))
    }

    fn on_change(&mut self, pins: &Pins<'_>) {
        let clock = pins.driven(self.clock).unwrap_or(Level::Low);
        if self.last_clock == Level::Low && clock == Level::High {
            match pins.driven(self.data) {
                Some(level) => self.bits.push_back(level.is_high()),
                None => {
                    self.bits.pop_front();
                }
            }
        }
        self.last_clock = clock;
    }
}

/// Pulse train on one line
///
/// Idles at the inverse of `polarity` until `start`, then holds `polarity`
/// for `width` ticks every `period` ticks (once if `period` is `None`).
#[derive(Debug, Clone, Copy)]
pub struct PulseSource {
    line: Line,
    polarity: Level,
    start: u32,
    width: u32,
    period: Option<u32>,
}

impl PulseSource {
    pub fn new(line: Line, polarity: Level, start: u32, width: u32, period: Option<u32>) -> Self {
        Self {
            line,
            polarity,
            start,
            width,
            period: period.map(|p| p.max(1)),
        }
    }
}

impl Device for PulseSource {
    fn drive(&self, line: Line, pins: &Pins<'_>) -> Option<Level> {
        if line != self.line {
            return None;
        }
        let now = pins.now();
        if !reached(now, self.start) {
            return Some(self.polarity.inverted());
        }
        let mut phase = now.wrapping_sub(self.start);
        if let Some(period) = self.period {
            phase %= period;
        }
        Some(if phase < self.width {
            self.polarity
        } else {
            self.polarity.inverted()
        })
    }
}

/// RC network discharging after the chip stops driving
///
/// After the line goes from output to input it keeps the level last driven
/// for `decay` ticks, then reads the opposite level.
#[derive(Debug, Clone, Copy)]
pub struct RcDecay {
    line: Line,
    decay: u32,
    charged: Option<Level>,
    released_at: Option<u32>,
}

impl RcDecay {
    pub fn new(line: Line, decay: u32) -> Self {
        Self {
            line,
            decay,
            charged: None,
            released_at: None,
        }
    }
}

impl Device for RcDecay {
    fn drive(&self, line: Line, pins: &Pins<'_>) -> Option<Level> {
        if line != self.line {
            return None;
        }
        let charged = self.charged?;
        match self.released_at {
            Some(at) if pins.now().wrapping_sub(at) < self.decay => Some(charged),
            _ => Some(charged.inverted()),
        }
    }

    fn on_change(&mut self, pins: &Pins<'_>) {
        match pins.driven(self.line) {
            Some(level) => {
                self.charged = Some(level);
                self.released_at = None;
            }
            None => {
                if self.charged.is_some() && self.released_at.is_none() {
                    self.released_at = Some(pins.now());
                }
            }
        }
    }
}

/// Free-running square wave with the given half period
#[derive(Debug, Clone, Copy)]
pub struct ClockSource {
    line: Line,
    half_period: u32,
    origin: u32,
}

impl ClockSource {
    pub fn new(line: Line, half_period: u32, origin: u32) -> Self {
        Self {
            line,
            half_period: half_period.max(1),
            origin,
        }
    }
}

impl Device for ClockSource {
    fn drive(&self, line: Line, pins: &Pins<'_>) -> Option<Level> {
        if line != self.line {
            return None;
        }
        let halves = pins.now().wrapping_sub(self.origin) / self.half_period;
        Some(Level::from(halves % 2 == 1))
    }
}
