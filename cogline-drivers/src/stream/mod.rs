//! Byte-stream drivers
//!
//! Three bit-banged drivers share one handle shape: they claim their lines
//! (and, for full duplex, a worker) when opened, implement
//! [`embedded_io::Read`] and [`embedded_io::Write`], and give everything
//! back on `close` or drop. Lines are left as last driven.
//!
//! - [`HalfDuplex`] - 8N1 serial timed from the caller's flow of control
//! - [`FullDuplex`] - 8N1 serial with a worker sampling the receive line
//! - [`Bus`] - MSB-first synchronous shift transfers

mod bus;
mod full_duplex;
mod half_duplex;

use core::hint::spin_loop;

use embedded_io::{ErrorType, Read, Write};

use cogline_core::time::Deadline;
use cogline_core::{Error, Result};
use cogline_hal::{Direction, Level, Line, LineIo, Platform, TickClock};

pub use bus::Bus;
pub use full_duplex::FullDuplex;
pub use half_duplex::HalfDuplex;

/// An open stream of any kind
pub enum Stream<P: Platform> {
    HalfDuplex(HalfDuplex<P>),
    FullDuplex(FullDuplex<P>),
    Bus(Bus<P>),
}

impl<P: Platform> Stream<P> {
    /// Release the stream's lines and worker (idempotent)
    pub fn close(&mut self) {
        match self {
            Stream::HalfDuplex(s) => s.close(),
            Stream::FullDuplex(s) => s.close(),
            Stream::Bus(s) => s.close(),
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            Stream::HalfDuplex(s) => s.is_open(),
            Stream::FullDuplex(s) => s.is_open(),
            Stream::Bus(s) => s.is_open(),
        }
    }
}

impl<P: Platform> From<HalfDuplex<P>> for Stream<P> {
    fn from(stream: HalfDuplex<P>) -> Self {
        Stream::HalfDuplex(stream)
    }
}

impl<P: Platform> From<FullDuplex<P>> for Stream<P> {
    fn from(stream: FullDuplex<P>) -> Self {
        Stream::FullDuplex(stream)
    }
}

impl<P: Platform> From<Bus<P>> for Stream<P> {
    fn from(stream: Bus<P>) -> Self {
        Stream::Bus(stream)
    }
}

impl<P: Platform> ErrorType for Stream<P> {
    type Error = Error;
}

impl<P: Platform> Read for Stream<P> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Stream::HalfDuplex(s) => s.read(buf),
            Stream::FullDuplex(s) => s.read(buf),
            Stream::Bus(s) => s.read(buf),
        }
    }
}

impl<P: Platform> Write for Stream<P> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self {
            Stream::HalfDuplex(s) => s.write(buf),
            Stream::FullDuplex(s) => s.write(buf),
            Stream::Bus(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            Stream::HalfDuplex(s) => s.flush(),
            Stream::FullDuplex(s) => s.flush(),
            Stream::Bus(s) => s.flush(),
        }
    }
}

/// Transmit side of an asynchronous serial line
#[derive(Debug, Clone, Copy)]
pub(crate) struct TxLine {
    pub line: Line,
    pub invert: bool,
    pub open_drain: bool,
}

impl TxLine {
    pub fn new(line: Line) -> Self {
        Self {
            line,
            invert: false,
            open_drain: false,
        }
    }

    /// Take the line and put it in the idle (mark) state
    pub fn engage<P: LineIo>(&self, platform: &P) {
        self.drive(platform, true);
        if !self.open_drain {
            platform.set_direction(self.line, Direction::Output);
        }
    }

    /// Put a mark (`true`) or space bit on the line
    pub fn drive<P: LineIo>(&self, platform: &P, mark: bool) {
        let level = Level::from(mark != self.invert);
        if self.open_drain {
            if mark {
                platform.set_direction(self.line, Direction::Input);
            } else {
                platform.set_output(self.line, level);
                platform.set_direction(self.line, Direction::Output);
            }
        } else {
            platform.set_output(self.line, level);
        }
    }

    /// Send one 8N1 frame, LSB first, blocking for its full length
    pub fn send_frame<P: LineIo + TickClock>(&self, platform: &P, byte: u8, bit_ticks: u32) {
        let mut target = platform.ticks();
        self.drive(platform, false);
        for bit in 0..8 {
            target = target.wrapping_add(bit_ticks);
            platform.wait_until(target);
            self.drive(platform, (byte >> bit) & 1 == 1);
        }
        target = target.wrapping_add(bit_ticks);
        platform.wait_until(target);
        self.drive(platform, true);
        platform.wait_until(target.wrapping_add(bit_ticks));
    }
}

/// Receive side of an asynchronous serial line
#[derive(Debug, Clone, Copy)]
pub(crate) struct RxLine {
    pub line: Line,
    pub invert: bool,
}

impl RxLine {
    /// Whether the line currently carries a mark bit
    pub fn is_mark<P: LineIo>(&self, platform: &P) -> bool {
        platform.level(self.line).is_high() != self.invert
    }

    /// Spin until a start bit begins, returning its tick
    ///
    /// A start bit is a mark-to-space edge, so a line that has not been
    /// seen idle first never counts. Both waits share `deadline`.
    pub fn await_start<P: LineIo + TickClock>(
        &self,
        platform: &P,
        deadline: &Deadline,
    ) -> Result<u32> {
        let mut idle = false;
        loop {
            let now = platform.ticks();
            let mark = self.is_mark(platform);
            if idle && !mark {
                return Ok(now);
            }
            idle |= mark;
            if deadline.expired(now) {
                return Err(Error::Timeout);
            }
            spin_loop();
        }
    }

    /// Sample the rest of a frame whose start bit began at `start`
    ///
    /// Bits are read mid-cell. `None` if the stop bit is missing.
    pub fn sample_frame<P: LineIo + TickClock>(
        &self,
        platform: &P,
        start: u32,
        bit_ticks: u32,
    ) -> Option<u8> {
        let mut target = start.wrapping_add(bit_ticks + bit_ticks / 2);
        let mut byte = 0u8;
        for bit in 0..8 {
            platform.wait_until(target);
            if self.is_mark(platform) {
                byte |= 1 << bit;
            }
            target = target.wrapping_add(bit_ticks);
        }
        platform.wait_until(target);
        self.is_mark(platform).then_some(byte)
    }
}

/// Deduplicated list of the lines a stream claims
pub(crate) fn distinct(lines: &[Option<Line>]) -> heapless::Vec<Line, 2> {
    let mut out = heapless::Vec::new();
    for line in lines.iter().flatten() {
        if !out.contains(line) {
            // At most two lines per stream
            let _ = out.push(*line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(i: u8) -> Line {
        Line::new(i).unwrap()
    }

    #[test]
    fn test_distinct_lines() {
        assert_eq!(
            distinct(&[Some(line(3)), Some(line(3))]).as_slice(),
            &[line(3)]
        );
        assert_eq!(
            distinct(&[None, Some(line(4))]).as_slice(),
            &[line(4)]
        );
        assert!(distinct(&[None, None]).is_empty());
    }
}
