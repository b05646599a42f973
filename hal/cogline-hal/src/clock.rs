//! System tick counter
//!
//! The counter is a free-running 32-bit value that wraps, so every
//! comparison is done with wrapping arithmetic. At 80 MHz it wraps about
//! every 53 seconds; any single interval handled by the runtime is far
//! shorter than half of that.

/// Free-running system tick counter
pub trait TickClock {
    /// Current counter value
    fn ticks(&self) -> u32;

    /// Counter frequency in Hz
    fn ticks_per_second(&self) -> u32;

    /// Block until the counter reaches `target`
    ///
    /// Returns immediately if `target` is already in the past (within half
    /// a wrap). Implementations must not wait for the counter to wrap
    /// around to a missed target.
    fn wait_until(&self, target: u32);

    /// Ticks in one microsecond (at least 1)
    fn ticks_per_us(&self) -> u32 {
        (self.ticks_per_second() / 1_000_000).max(1)
    }

    /// Ticks in one millisecond (at least 1)
    fn ticks_per_ms(&self) -> u32 {
        (self.ticks_per_second() / 1_000).max(1)
    }

    /// Block for `ticks` counter ticks from now
    fn delay_ticks(&self, ticks: u32) {
        let target = self.ticks().wrapping_add(ticks);
        self.wait_until(target);
    }
}

/// True once `now` has reached or passed `target`
///
/// Uses the signed wrapping distance, valid while the two values are less
/// than half a wrap apart.
#[inline]
pub fn reached(now: u32, target: u32) -> bool {
    (now.wrapping_sub(target) as i32) >= 0
}

/// Ticks left until `target`, zero if already reached
#[inline]
pub fn remaining(now: u32, target: u32) -> u32 {
    if reached(now, target) {
        0
    } else {
        target.wrapping_sub(now)
    }
}
