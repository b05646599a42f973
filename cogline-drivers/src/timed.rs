//! Timed-I/O primitives
//!
//! Blocking operations run in the caller's own flow of control. They take
//! no persistent ownership: each one refuses a claimed line, sets the
//! direction it needs and leaves the line as last driven. Measurements are
//! reported in I/O units (count units for `count_transitions`) and are
//! bounded by the time base's timeout ceiling.

use core::hint::spin_loop;

use cogline_core::shift::{check_width, wire_bit, BitAssembler};
use cogline_core::time::{Deadline, Unit};
use cogline_core::{Error, Result};
use cogline_hal::clock::reached;
use cogline_hal::{
    BitOrder, Direction, Level, Line, LineIo, Platform, SampleEdge, ShiftInMode, TickClock,
};

use crate::runtime::Cogline;

/// Spin until `line` reads `level` or `deadline` expires
///
/// Returns the tick count at which the level was seen.
pub(crate) fn wait_for_level<P: LineIo + TickClock>(
    platform: &P,
    line: Line,
    level: Level,
    deadline: &Deadline,
) -> Result<u32> {
    loop {
        let now = platform.ticks();
        if platform.level(line) == level {
            return Ok(now);
        }
        if deadline.expired(now) {
            return Err(Error::Timeout);
        }
        spin_loop();
    }
}

/// Clock out `bits` bits of `value`; the clock idles low and each bit
/// gets one high pulse of `half_period` ticks
pub(crate) fn clock_out<P: LineIo + TickClock>(
    platform: &P,
    data: Line,
    clock: Line,
    order: BitOrder,
    bits: u32,
    value: u32,
    half_period: u32,
) {
    platform.set_output(clock, Level::Low);
    platform.set_direction(clock, Direction::Output);
    platform.set_direction(data, Direction::Output);

    for index in 0..bits {
        platform.set_output(data, Level::from(wire_bit(value, bits, order, index)));
        platform.delay_ticks(half_period);
        platform.set_output(clock, Level::High);
        platform.delay_ticks(half_period);
        platform.set_output(clock, Level::Low);
    }
}

/// Clock in `bits` bits, sampling before or after each clock pulse
pub(crate) fn clock_in<P: LineIo + TickClock>(
    platform: &P,
    data: Line,
    clock: Line,
    mode: ShiftInMode,
    bits: u32,
    half_period: u32,
) -> Result<u32> {
    let mut assembler = BitAssembler::new(bits, mode.order())?;
    platform.set_output(clock, Level::Low);
    platform.set_direction(clock, Direction::Output);
    platform.set_direction(data, Direction::Input);

    while !assembler.is_complete() {
        if mode.edge() == SampleEdge::Pre {
            assembler.push(platform.level(data).is_high());
        }
        platform.set_output(clock, Level::High);
        platform.delay_ticks(half_period);
        platform.set_output(clock, Level::Low);
        if mode.edge() == SampleEdge::Post {
            assembler.push(platform.level(data).is_high());
        }
        platform.delay_ticks(half_period);
    }
    Ok(assembler.value())
}

impl<P: Platform> Cogline<P> {
    /// Measure the next pulse of `polarity` on `line`
    ///
    /// A pulse already in progress when the call starts is skipped. Fails
    /// with `Timeout` if the ceiling elapses before the pulse ends.
    pub fn pulse_in(&self, line: Line, polarity: Level) -> Result<u32> {
        let shared = &self.shared;
        shared.ensure_unclaimed(line)?;
        let platform = &shared.platform;
        platform.set_direction(line, Direction::Input);

        let deadline = shared.time.deadline(platform);
        let measure = || -> Result<u32> {
            wait_for_level(platform, line, polarity.inverted(), &deadline)?;
            let start = wait_for_level(platform, line, polarity, &deadline)?;
            let end = wait_for_level(platform, line, polarity.inverted(), &deadline)?;
            Ok(end.wrapping_sub(start))
        };

        match measure() {
            Ok(ticks) => Ok(shared.time.from_ticks(ticks, Unit::Io)),
            Err(e) => {
                debug!("pulse_in on line {} timed out", line.index());
                Err(e)
            }
        }
    }

    /// Drive the opposite of the current output bit for `duration` I/O
    /// units, then restore the bit. The line is an output afterwards.
    pub fn pulse_out(&self, line: Line, duration: u32) -> Result<()> {
        let shared = &self.shared;
        shared.ensure_unclaimed(line)?;
        let platform = &shared.platform;

        let idle = platform.output(line);
        let ticks = shared.time.to_ticks(duration, Unit::Io);
        platform.set_output(line, idle.inverted());
        platform.set_direction(line, Direction::Output);
        let start = platform.ticks();
        platform.wait_until(start.wrapping_add(ticks));
        platform.set_output(line, idle);
        Ok(())
    }

    /// Charge `line` to `start_state` for one I/O unit, release it and
    /// time how long it takes to read the opposite state
    pub fn rc_time(&self, line: Line, start_state: Level) -> Result<u32> {
        let shared = &self.shared;
        shared.ensure_unclaimed(line)?;
        let platform = &shared.platform;

        platform.set_output(line, start_state);
        platform.set_direction(line, Direction::Output);
        platform.delay_ticks(shared.time.unit_ticks(Unit::Io));
        platform.set_direction(line, Direction::Input);

        let deadline = shared.time.deadline(platform);
        match wait_for_level(platform, line, start_state.inverted(), &deadline) {
            Ok(end) => Ok(shared
                .time
                .from_ticks(end.wrapping_sub(deadline.start()), Unit::Io)),
            Err(e) => {
                debug!("rc_time on line {} timed out", line.index());
                Err(e)
            }
        }
    }

    /// Count low-to-high transitions on `line` over `duration` count units
    pub fn count_transitions(&self, line: Line, duration: u32) -> Result<u32> {
        let shared = &self.shared;
        shared.ensure_unclaimed(line)?;
        let platform = &shared.platform;
        platform.set_direction(line, Direction::Input);

        let end = platform
            .ticks()
            .wrapping_add(shared.time.to_ticks(duration, Unit::Count));
        let mut previous = platform.level(line);
        let mut transitions = 0u32;
        while !reached(platform.ticks(), end) {
            let level = platform.level(line);
            if previous == Level::Low && level == Level::High {
                transitions = transitions.saturating_add(1);
            }
            previous = level;
            spin_loop();
        }
        Ok(transitions)
    }

    /// Clock `bits` bits in from a synchronous device
    pub fn shift_in(&self, data: Line, clock: Line, mode: ShiftInMode, bits: u32) -> Result<u32> {
        check_width(bits)?;
        self.check_shift_lines(data, clock)?;
        let half = self.shared.time.unit_ticks(Unit::Io);
        clock_in(&self.shared.platform, data, clock, mode, bits, half)
    }

    /// Clock the low `bits` bits of `value` out to a synchronous device
    pub fn shift_out(
        &self,
        data: Line,
        clock: Line,
        order: BitOrder,
        bits: u32,
        value: u32,
    ) -> Result<()> {
        check_width(bits)?;
        self.check_shift_lines(data, clock)?;
        let half = self.shared.time.unit_ticks(Unit::Io);
        clock_out(&self.shared.platform, data, clock, order, bits, value, half);
        Ok(())
    }

    fn check_shift_lines(&self, data: Line, clock: Line) -> Result<()> {
        if data == clock {
            return Err(Error::InvalidArgument);
        }
        self.shared.ensure_unclaimed(data)?;
        self.shared.ensure_unclaimed(clock)
    }
}
