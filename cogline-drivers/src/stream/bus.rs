use std::sync::Arc;

use embedded_io::{ErrorType, Read, Write};

use cogline_core::registry::{Claimant, ReleasePolicy};
use cogline_core::time::Unit;
use cogline_core::{Error, Result};
use cogline_hal::{BitOrder, Direction, Level, Line, LineIo, Platform, ShiftInMode};

use super::distinct;
use crate::runtime::{Cogline, Shared};
use crate::timed::{clock_in, clock_out};

/// Synchronous bus moving whole bytes MSB first
///
/// The clock idles low. Reads sample the data line before each clock
/// pulse. Each clock phase lasts one I/O unit as set when the bus opened.
pub struct Bus<P: Platform> {
    shared: Arc<Shared<P>>,
    clock: Line,
    data: Line,
    half_period: u32,
    claimant: Claimant,
    open: bool,
}

impl<P: Platform> Cogline<P> {
    /// Open a synchronous bus on `clock` and `data`
    pub fn open_bus(&self, clock: Line, data: Line) -> Result<Bus<P>> {
        Bus::open(self.shared.clone(), clock, data)
    }
}

impl<P: Platform> Bus<P> {
    fn open(shared: Arc<Shared<P>>, clock: Line, data: Line) -> Result<Self> {
        if clock == data {
            return Err(Error::InvalidArgument);
        }
        let claimant = Claimant::Driver(shared.next_driver_id());
        let claims: heapless::Vec<_, 2> = distinct(&[Some(clock), Some(data)])
            .iter()
            .map(|line| (*line, shared.snapshot(*line)))
            .collect();
        shared.lines.claim_all(&claims, claimant)?;

        shared.platform.set_output(clock, Level::Low);
        shared.platform.set_direction(clock, Direction::Output);
        let half_period = shared.time.unit_ticks(Unit::Io);
        debug!(
            "bus open on clock {} data {}",
            clock.index(),
            data.index()
        );

        Ok(Self {
            shared,
            clock,
            data,
            half_period,
            claimant,
            open: true,
        })
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

    /// Release both lines, leaving them as last driven (idempotent)
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        for line in self.shared.lines.release_all_of(self.claimant) {
            self.shared.settle(line, ReleasePolicy::LeaveDriven);
        }
    }
}

impl<P: Platform> Drop for Bus<P> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<P: Platform> ErrorType for Bus<P> {
    type Error = Error;
}

impl<P: Platform> Read for Bus<P> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        for slot in buf.iter_mut() {
            let value = clock_in(
                &self.shared.platform,
                self.data,
                self.clock,
                ShiftInMode::MsbPre,
                8,
                self.half_period,
            )?;
            *slot = value as u8;
        }
        Ok(buf.len())
    }
}

impl<P: Platform> Write for Bus<P> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        for byte in buf {
            clock_out(
                &self.shared.platform,
                self.data,
                self.clock,
                BitOrder::MsbFirst,
                8,
                u32::from(*byte),
                self.half_period,
            );
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.check_open()
    }
}
