use cogline_core::generator::square::counter_mode_for;
use cogline_core::registry::{Claimant, ReleasePolicy};
use cogline_core::Result;
use cogline_hal::{CounterBank, CounterSlot, Direction, Line, LineIo, Platform, TickClock, WorkerId};

use crate::runtime::Cogline;

impl<P: Platform> Cogline<P> {
    /// Emit a square wave of `hz` on `line` for `ms` milliseconds using
    /// the foreground unit's counter A, then put the line back to input
    ///
    /// Blocks for the whole duration. The line is claimed while the tone
    /// plays, and concurrent callers take turns on the counter.
    pub fn freqout(&self, line: Line, ms: u32, hz: u32) -> Result<()> {
        let shared = &self.shared;
        let mode = counter_mode_for(hz, shared.platform.ticks_per_second())?;

        let _tone = shared.tone.lock();
        let claimant = Claimant::Driver(shared.next_driver_id());
        shared.lines.claim(line, claimant, shared.snapshot(line))?;

        shared.platform.set_direction(line, Direction::Output);
        shared
            .platform
            .configure(WorkerId::FOREGROUND, CounterSlot::A, line, mode);
        shared.delay_ms(ms);
        shared.platform.disable(WorkerId::FOREGROUND, CounterSlot::A);
        shared.settle(line, ReleasePolicy::ResetToInput);
        shared.lines.release_if(line, claimant);
        Ok(())
    }
}
