//! Convenience call surface
//!
//! Flat calls with signed pin numbers and plain integers, for code written
//! against the classic helper-library names. Pins are `0..32`; a negative
//! pin means "no line" where unbinding makes sense and is rejected
//! elsewhere. Timed measurements report a timeout as `0`. The DAC and
//! square-wave families start on first use.
//!
//! ```ignore
//! let io = cogline.simple();
//! io.pwm_start(1000)?;
//! io.pwm_set(3, 0, 750)?; // 75% duty on line 3
//! io.pause(500);
//! io.pwm_stop();
//! ```

use std::sync::atomic::Ordering;

use cogline_core::config::MAX_DAC_BITS;
use cogline_core::{Error, Result};
use cogline_hal::{BitOrder, Direction, Level, Line, LineIo, Platform, ShiftInMode};

use crate::runtime::Cogline;

/// Line for a pin that must name one
fn line(pin: i32) -> Result<Line> {
    Line::from_pin(pin)?.ok_or(Error::InvalidArgument)
}

/// Line for a pin where negative means "unbind"
fn optional_line(pin: i32) -> Result<Option<Line>> {
    Ok(Line::from_pin(pin)?)
}

fn non_negative(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::InvalidArgument)
}

fn level_of(value: i32) -> Level {
    Level::from(value != 0)
}

/// Map a timeout to zero, keep every other error
fn zero_on_timeout(result: Result<u32>) -> Result<i32> {
    match result {
        Ok(units) => Ok(i32::try_from(units).unwrap_or(i32::MAX)),
        Err(Error::Timeout) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Accept a lost start race against another caller
fn already_running(started: Result<()>, running: bool) -> Result<()> {
    match started {
        Err(Error::ResourceExhausted) if running => Ok(()),
        other => other,
    }
}

fn bit(level: Level) -> i32 {
    level.bit() as i32
}

impl<P: Platform> Cogline<P> {
    /// Convenience call surface over this runtime
    pub fn simple(&self) -> Simple<'_, P> {
        Simple { cog: self }
    }
}

/// Flat helper calls on a runtime
pub struct Simple<'a, P: Platform> {
    cog: &'a Cogline<P>,
}

impl<P: Platform> Simple<'_, P> {
    // ── Time ──────────────────────────────────────────────────────────────

    /// Block for `dt` pause units (1 ms by default)
    pub fn pause(&self, dt: i32) {
        self.cog.pause(dt.max(0) as u32);
    }

    pub fn mark(&self) {
        self.cog.mark();
    }

    /// 1 if `time` I/O units have passed since the mark, else 0
    pub fn timeout(&self, time: i32) -> i32 {
        self.cog.timeout(time.max(0) as u32) as i32
    }

    /// Block until `time` I/O units after the mark and re-mark
    pub fn wait(&self, time: i32) {
        self.cog.wait(time.max(0) as u32);
    }

    pub fn set_pause_dt(&self, clock_ticks: i32) -> Result<()> {
        self.cog.time().set_pause_unit(non_negative(clock_ticks)?)
    }

    pub fn set_io_dt(&self, clock_ticks: i32) -> Result<()> {
        self.cog.time().set_io_unit(non_negative(clock_ticks)?)
    }

    /// Set the timed-I/O timeout ceiling in ticks (0 disables it)
    pub fn set_io_timeout(&self, clock_ticks: i32) -> Result<()> {
        self.cog.time().set_io_timeout(non_negative(clock_ticks)?);
        Ok(())
    }

    // ── Timed I/O ─────────────────────────────────────────────────────────

    /// Low-to-high transitions on `pin` over `duration` count units
    pub fn count(&self, pin: i32, duration: i32) -> Result<i32> {
        let transitions = self
            .cog
            .count_transitions(line(pin)?, non_negative(duration)?)?;
        Ok(i32::try_from(transitions).unwrap_or(i32::MAX))
    }

    /// Length of the next pulse of `state` in I/O units, 0 on timeout
    pub fn pulse_in(&self, pin: i32, state: i32) -> Result<i32> {
        zero_on_timeout(self.cog.pulse_in(line(pin)?, level_of(state)))
    }

    pub fn pulse_out(&self, pin: i32, time: i32) -> Result<()> {
        self.cog.pulse_out(line(pin)?, non_negative(time)?)
    }

    /// RC decay time from `state` in I/O units, 0 on timeout
    pub fn rc_time(&self, pin: i32, state: i32) -> Result<i32> {
        zero_on_timeout(self.cog.rc_time(line(pin)?, level_of(state)))
    }

    /// Shift in `bits` bits; `mode` 0..=3 is MSB-pre, LSB-pre, MSB-post,
    /// LSB-post
    pub fn shift_in(&self, pin_dat: i32, pin_clk: i32, mode: i32, bits: i32) -> Result<i32> {
        let mode = ShiftInMode::from_code(mode).ok_or(Error::InvalidArgument)?;
        let value = self
            .cog
            .shift_in(line(pin_dat)?, line(pin_clk)?, mode, non_negative(bits)?)?;
        Ok(value as i32)
    }

    /// Shift out the low `bits` bits of `value`; `mode` 0 is LSB first,
    /// 1 is MSB first
    pub fn shift_out(
        &self,
        pin_dat: i32,
        pin_clk: i32,
        mode: i32,
        bits: i32,
        value: i32,
    ) -> Result<()> {
        let order = BitOrder::from_code(mode).ok_or(Error::InvalidArgument)?;
        self.cog.shift_out(
            line(pin_dat)?,
            line(pin_clk)?,
            order,
            non_negative(bits)?,
            value as u32,
        )
    }

    pub fn freqout(&self, pin: i32, ms_time: i32, frequency: i32) -> Result<()> {
        self.cog
            .freqout(line(pin)?, non_negative(ms_time)?, non_negative(frequency)?)
    }

    // ── Generators ────────────────────────────────────────────────────────

    /// Start PWM with a cycle of `cycle_us`; returns the worker index
    pub fn pwm_start(&self, cycle_us: u32) -> Result<i32> {
        self.cog.start_pwm(cycle_us)?;
        self.cog
            .pwm()
            .worker()
            .map(|worker| worker.index() as i32)
            .ok_or(Error::UseAfterStop)
    }

    /// Set a PWM channel's high time; a negative pin unbinds the channel
    pub fn pwm_set(&self, pin: i32, channel: i32, t_high: i32) -> Result<()> {
        let channel = non_negative(channel)? as usize;
        self.cog
            .pwm()
            .set_channel(channel, optional_line(pin)?, non_negative(t_high)?)
    }

    pub fn pwm_stop(&self) {
        self.cog.pwm().stop();
    }

    /// Set the DAC resolution used by `dac_ctr`
    ///
    /// A running DAC family with a different resolution is stopped; the
    /// next `dac_ctr` starts it again at the new resolution.
    pub fn dac_ctr_res(&self, bits: i32) -> Result<()> {
        let bits = u8::try_from(bits)
            .ok()
            .filter(|bits| (1..=MAX_DAC_BITS).contains(bits))
            .ok_or(Error::InvalidArgument)?;
        self.cog.dac_bits.store(bits, Ordering::Relaxed);
        if let Some(wave) = self.cog.dac().wave() {
            if wave.resolution_bits() != bits {
                self.cog.dac().stop();
            }
        }
        Ok(())
    }

    /// Drive `dac_val / 2^bits` duty on `pin`, starting the DAC family if
    /// needed; a negative pin unbinds the channel
    pub fn dac_ctr(&self, pin: i32, channel: i32, dac_val: i32) -> Result<()> {
        let line = optional_line(pin)?;
        if !self.cog.dac().is_running() {
            if line.is_none() {
                return Ok(());
            }
            let started = self.cog.start_dac(self.cog.dac_bits.load(Ordering::Relaxed));
            already_running(started, self.cog.dac().is_running())?;
        }
        self.cog
            .dac()
            .set_channel(non_negative(channel)? as usize, line, non_negative(dac_val)?)
    }

    pub fn dac_ctrs_stop(&self) {
        self.cog.dac().stop();
    }

    /// Emit `freq` Hz on `pin`, starting the square-wave family if needed;
    /// a negative pin unbinds the channel
    pub fn square_wave(&self, pin: i32, channel: i32, freq: i32) -> Result<()> {
        let line = optional_line(pin)?;
        if !self.cog.square_wave().is_running() {
            if line.is_none() {
                return Ok(());
            }
            let started = self.cog.start_square_wave();
            already_running(started, self.cog.square_wave().is_running())?;
        }
        self.cog
            .square_wave()
            .set_channel(non_negative(channel)? as usize, line, non_negative(freq)?)
    }

    pub fn square_wave_stop(&self) {
        self.cog.square_wave().stop();
    }

    // ── Registers ─────────────────────────────────────────────────────────

    pub fn high(&self, pin: i32) -> Result<()> {
        self.cog.platform().high(line(pin)?);
        Ok(())
    }

    pub fn low(&self, pin: i32) -> Result<()> {
        self.cog.platform().low(line(pin)?);
        Ok(())
    }

    /// Flip the output bit and make the pin an output; returns the new bit
    pub fn toggle(&self, pin: i32) -> Result<i32> {
        Ok(bit(self.cog.platform().toggle(line(pin)?)))
    }

    /// Make the pin an input and read it
    pub fn input(&self, pin: i32) -> Result<i32> {
        Ok(bit(self.cog.platform().input(line(pin)?)))
    }

    /// Flip the direction; returns 1 for output
    pub fn reverse(&self, pin: i32) -> Result<i32> {
        let direction = self.cog.platform().reverse(line(pin)?);
        Ok((direction == Direction::Output) as i32)
    }

    /// Read the pin without changing its direction
    pub fn get_state(&self, pin: i32) -> Result<i32> {
        Ok(bit(self.cog.platform().level(line(pin)?)))
    }

    pub fn get_direction(&self, pin: i32) -> Result<i32> {
        Ok((self.cog.platform().direction(line(pin)?) == Direction::Output) as i32)
    }

    pub fn get_output(&self, pin: i32) -> Result<i32> {
        Ok(bit(self.cog.platform().output(line(pin)?)))
    }

    pub fn set_direction(&self, pin: i32, direction: i32) -> Result<()> {
        let direction = if direction != 0 {
            Direction::Output
        } else {
            Direction::Input
        };
        self.cog.platform().set_direction(line(pin)?, direction);
        Ok(())
    }

    pub fn set_output(&self, pin: i32, state: i32) -> Result<()> {
        self.cog.platform().set_output(line(pin)?, level_of(state));
        Ok(())
    }

    /// Levels of pins `start_pin..=end_pin`, `start_pin` in bit 0
    pub fn get_states(&self, end_pin: i32, start_pin: i32) -> Result<u32> {
        Ok(self.cog.platform().levels(line(start_pin)?, line(end_pin)?))
    }

    pub fn get_directions(&self, end_pin: i32, start_pin: i32) -> Result<u32> {
        Ok(self
            .cog
            .platform()
            .directions(line(start_pin)?, line(end_pin)?))
    }

    pub fn get_outputs(&self, end_pin: i32, start_pin: i32) -> Result<u32> {
        Ok(self.cog.platform().outputs(line(start_pin)?, line(end_pin)?))
    }

    pub fn set_outputs(&self, end_pin: i32, start_pin: i32, pattern: u32) -> Result<()> {
        self.cog
            .platform()
            .set_outputs(line(start_pin)?, line(end_pin)?, pattern);
        Ok(())
    }

    pub fn set_directions(&self, end_pin: i32, start_pin: i32, pattern: u32) -> Result<()> {
        self.cog
            .platform()
            .set_directions(line(start_pin)?, line(end_pin)?, pattern);
        Ok(())
    }
}
