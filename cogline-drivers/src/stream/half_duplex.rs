use std::sync::Arc;

use embedded_io::{ErrorType, Read, Write};

use cogline_core::registry::{Claimant, ReleasePolicy};
use cogline_core::time::Deadline;
use cogline_core::{Error, Result};
use cogline_hal::{Direction, Line, LineIo, Platform, SerialConfig, TickClock};

use super::{distinct, RxLine, TxLine};
use crate::runtime::{Cogline, Shared};

/// Frames of silence after which a multi-byte read returns early
const GAP_FRAMES: u32 = 2;

/// Half-duplex 8N1 serial bit-banged from the caller's flow of control
///
/// Bytes only arrive while a `read` is waiting for them. Transmit and
/// receive may share one line; it is then an output only while writing.
pub struct HalfDuplex<P: Platform> {
    shared: Arc<Shared<P>>,
    tx: Option<TxLine>,
    rx: Option<RxLine>,
    bit_ticks: u32,
    claimant: Claimant,
    open: bool,
}

impl<P: Platform> Cogline<P> {
    /// Open a half-duplex serial stream on `tx` and/or `rx`
    pub fn open_half_duplex(
        &self,
        tx: Option<Line>,
        rx: Option<Line>,
        baudrate: u32,
    ) -> Result<HalfDuplex<P>> {
        HalfDuplex::open(self.shared.clone(), tx, rx, baudrate)
    }
}

impl<P: Platform> HalfDuplex<P> {
    fn open(
        shared: Arc<Shared<P>>,
        tx: Option<Line>,
        rx: Option<Line>,
        baudrate: u32,
    ) -> Result<Self> {
        if tx.is_none() && rx.is_none() {
            return Err(Error::InvalidArgument);
        }
        let bit_ticks = SerialConfig::new(baudrate)
            .bit_ticks(shared.platform.ticks_per_second())
            .ok_or(Error::InvalidArgument)?;

        let claimant = Claimant::Driver(shared.next_driver_id());
        let lines = distinct(&[tx, rx]);
        let claims: heapless::Vec<_, 2> = lines
            .iter()
            .map(|line| (*line, shared.snapshot(*line)))
            .collect();
        shared.lines.claim_all(&claims, claimant)?;

        let stream = Self {
            tx: tx.map(TxLine::new),
            rx: rx.map(|line| RxLine {
                line,
                invert: false,
            }),
            bit_ticks,
            claimant,
            open: true,
            shared,
        };
        stream.idle();
        debug!("half-duplex open at {} baud as {:?}", baudrate, claimant);
        Ok(stream)
    }

    fn shares_line(&self) -> bool {
        matches!((self.tx, self.rx), (Some(tx), Some(rx)) if tx.line == rx.line)
    }

    /// Put the lines in their resting state
    fn idle(&self) {
        let platform = &self.shared.platform;
        if let Some(rx) = self.rx {
            platform.set_direction(rx.line, Direction::Input);
        }
        if let Some(tx) = self.tx.filter(|_| !self.shares_line()) {
            tx.engage(platform);
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::UseAfterClose)
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Ticks per bit
    pub fn bit_ticks(&self) -> u32 {
        self.bit_ticks
    }

    /// Release the lines, leaving them as last driven (idempotent)
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        for line in self.shared.lines.release_all_of(self.claimant) {
            self.shared.settle(line, ReleasePolicy::LeaveDriven);
        }
        debug!("half-duplex {:?} closed", self.claimant);
    }
}

impl<P: Platform> Drop for HalfDuplex<P> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<P: Platform> ErrorType for HalfDuplex<P> {
    type Error = Error;
}

impl<P: Platform> Read for HalfDuplex<P> {
    /// Wait for the first byte up to the timeout ceiling, then keep
    /// reading until `buf` is full or the line goes quiet
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let rx = self.rx.ok_or(Error::InvalidArgument)?;
        if buf.is_empty() {
            return Ok(0);
        }
        let platform = &self.shared.platform;
        if self.shares_line() {
            platform.set_direction(rx.line, Direction::Input);
        }

        let gap = self.bit_ticks.saturating_mul(10 * GAP_FRAMES);
        let mut deadline = self.shared.time.deadline(platform);
        let mut count = 0;
        while count < buf.len() {
            let start = match rx.await_start(platform, &deadline) {
                Ok(start) => start,
                Err(Error::Timeout) if count > 0 => break,
                Err(e) => return Err(e),
            };
            match rx.sample_frame(platform, start, self.bit_ticks) {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                    deadline = Deadline::new(platform.ticks(), gap);
                }
                // keep the current deadline so noise cannot hold the read open
                None => trace!("half-duplex framing error"),
            }
        }
        Ok(count)
    }
}

impl<P: Platform> Write for HalfDuplex<P> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        let tx = self.tx.ok_or(Error::InvalidArgument)?;
        let platform = &self.shared.platform;

        tx.engage(platform);
        for byte in buf {
            tx.send_frame(platform, *byte, self.bit_ticks);
        }
        if self.shares_line() {
            platform.set_direction(tx.line, Direction::Input);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.check_open()
    }
}
