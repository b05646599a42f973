//! Shared time base
//!
//! Holds the tick length of each caller-facing time unit, the timed-I/O
//! timeout ceiling and the "last mark" reference used by `timeout` and
//! `wait`. Values live in atomics so the time base can sit in shared
//! runtime state; configuration is expected to happen before the timing
//! operations that depend on it.

use core::sync::atomic::{AtomicU32, Ordering};

use cogline_hal::clock::{reached, TickClock};

use crate::config::TimingConfig;
use crate::error::{Error, Result};

/// Time unit selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Unit {
    /// Raw system ticks
    Tick,
    /// `pause` unit (1 ms by default)
    Pause,
    /// Timed-I/O unit (1 µs by default)
    Io,
    /// Transition-count unit (1 µs by default)
    Count,
}

/// Shared tick-to-duration configuration and mark reference
#[derive(Debug)]
pub struct TimeBase {
    pause_ticks: AtomicU32,
    io_ticks: AtomicU32,
    count_ticks: AtomicU32,
    timeout_ticks: AtomicU32,
    mark: AtomicU32,
}

impl TimeBase {
    /// Create a time base from wall-clock settings and a tick rate
    pub fn new(config: &TimingConfig, ticks_per_second: u32) -> Self {
        let per_us = u64::from((ticks_per_second / 1_000_000).max(1));
        let ticks = |us: u32| (u64::from(us) * per_us).clamp(1, u64::from(u32::MAX)) as u32;
        let timeout =
            (u64::from(config.io_timeout_ms) * u64::from(ticks_per_second) / 1_000)
                .min(u64::from(u32::MAX / 2)) as u32;

        Self {
            pause_ticks: AtomicU32::new(ticks(config.pause_unit_us)),
            io_ticks: AtomicU32::new(ticks(config.io_unit_us)),
            count_ticks: AtomicU32::new(ticks(config.count_unit_us)),
            timeout_ticks: AtomicU32::new(timeout),
            mark: AtomicU32::new(0),
        }
    }

    /// Set the length of one `pause` unit in ticks
    pub fn set_pause_unit(&self, ticks: u32) -> Result<()> {
        Self::store_unit(&self.pause_ticks, ticks)
    }

    /// Set the length of one timed-I/O unit in ticks
    pub fn set_io_unit(&self, ticks: u32) -> Result<()> {
        Self::store_unit(&self.io_ticks, ticks)
    }

    /// Set the length of one transition-count unit in ticks
    pub fn set_count_unit(&self, ticks: u32) -> Result<()> {
        Self::store_unit(&self.count_ticks, ticks)
    }

    /// Set the timed-I/O timeout ceiling in ticks (0 disables it)
    pub fn set_io_timeout(&self, ticks: u32) {
        self.timeout_ticks.store(ticks, Ordering::Relaxed);
    }

    fn store_unit(slot: &AtomicU32, ticks: u32) -> Result<()> {
        if ticks == 0 {
            return Err(Error::InvalidArgument);
        }
        slot.store(ticks, Ordering::Relaxed);
        Ok(())
    }

    /// Ticks in one `unit`
    pub fn unit_ticks(&self, unit: Unit) -> u32 {
        match unit {
            Unit::Tick => 1,
            Unit::Pause => self.pause_ticks.load(Ordering::Relaxed),
            Unit::Io => self.io_ticks.load(Ordering::Relaxed),
            Unit::Count => self.count_ticks.load(Ordering::Relaxed),
        }
    }

    /// Timeout ceiling in ticks (0 = none)
    pub fn io_timeout(&self) -> u32 {
        self.timeout_ticks.load(Ordering::Relaxed)
    }

    /// Convert `n` units to ticks, saturating at half a counter wrap
    pub fn to_ticks(&self, n: u32, unit: Unit) -> u32 {
        let ticks = u64::from(n) * u64::from(self.unit_ticks(unit));
        ticks.min(u64::from(u32::MAX / 2)) as u32
    }

    /// Convert a tick count to whole units
    pub fn from_ticks(&self, ticks: u32, unit: Unit) -> u32 {
        ticks / self.unit_ticks(unit)
    }

    /// Record the current counter value as the reference point
    pub fn mark<C: TickClock + ?Sized>(&self, clock: &C) {
        self.mark.store(clock.ticks(), Ordering::Relaxed);
    }

    /// Raw marked counter value
    pub fn marked(&self) -> u32 {
        self.mark.load(Ordering::Relaxed)
    }

    /// Time since the last mark in `unit`
    pub fn elapsed_since_mark<C: TickClock + ?Sized>(&self, clock: &C, unit: Unit) -> u32 {
        let elapsed = clock.ticks().wrapping_sub(self.marked());
        self.from_ticks(elapsed, unit)
    }

    /// True once `units` timed-I/O units have passed since the mark
    pub fn timeout<C: TickClock + ?Sized>(&self, clock: &C, units: u32) -> bool {
        let target = self.marked().wrapping_add(self.to_ticks(units, Unit::Io));
        reached(clock.ticks(), target)
    }

    /// Block until `units` timed-I/O units after the mark, then advance
    /// the mark to that target
    ///
    /// Repeated calls are evenly spaced even when the caller overruns a
    /// little. After an overrun of a whole period or more the mark is
    /// re-anchored to the wake time, so at most one period is caught up.
    pub fn wait<C: TickClock + ?Sized>(&self, clock: &C, units: u32) {
        let period = self.to_ticks(units, Unit::Io);
        let target = self.marked().wrapping_add(period);
        clock.wait_until(target);

        let now = clock.ticks();
        let late = now.wrapping_sub(target);
        let next = if period > 0 && late >= period { now } else { target };
        self.mark.store(next, Ordering::Relaxed);
    }

    /// Block for `n` pause units without touching the mark
    pub fn pause<C: TickClock + ?Sized>(&self, clock: &C, n: u32) {
        let step = self.unit_ticks(Unit::Pause);
        let mut target = clock.ticks();
        // One unit at a time so long pauses never approach a counter wrap
        for _ in 0..n {
            target = target.wrapping_add(step);
            clock.wait_until(target);
        }
    }

    /// Open a timeout window for a timed-I/O operation
    pub fn deadline<C: TickClock + ?Sized>(&self, clock: &C) -> Deadline {
        Deadline {
            start: clock.ticks(),
            ceiling: self.io_timeout(),
        }
    }
}

/// Timeout window started by a timed-I/O operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start: u32,
    ceiling: u32,
}

impl Deadline {
    /// Window of `ceiling` ticks from `start` (0 = never expires)
    pub const fn new(start: u32, ceiling: u32) -> Self {
        Self { start, ceiling }
    }

    /// Window that never expires
    pub const fn unbounded(start: u32) -> Self {
        Self { start, ceiling: 0 }
    }

    /// Whether the ceiling has elapsed at `now`
    pub fn expired(&self, now: u32) -> bool {
        self.ceiling != 0 && now.wrapping_sub(self.start) >= self.ceiling
    }

    pub fn start(&self) -> u32 {
        self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    /// Clock that only moves when told to; waiting jumps to the target
    struct StepClock {
        now: Cell<u32>,
        late_by: Cell<u32>,
    }

    impl StepClock {
        fn new(start: u32) -> Self {
            Self {
                now: Cell::new(start),
                late_by: Cell::new(0),
            }
        }

        fn advance(&self, ticks: u32) {
            self.now.set(self.now.get().wrapping_add(ticks));
        }
    }

    impl TickClock for StepClock {
        fn ticks(&self) -> u32 {
            self.now.get()
        }

        fn ticks_per_second(&self) -> u32 {
            80_000_000
        }

        fn wait_until(&self, target: u32) {
            if !reached(self.now.get(), target) {
                self.now.set(target.wrapping_add(self.late_by.get()));
            }
        }
    }

    fn time_base() -> TimeBase {
        TimeBase::new(&TimingConfig::default(), 80_000_000)
    }

    #[test]
    fn test_default_units() {
        let tb = time_base();
        assert_eq!(tb.unit_ticks(Unit::Pause), 80_000);
        assert_eq!(tb.unit_ticks(Unit::Io), 80);
        assert_eq!(tb.unit_ticks(Unit::Count), 80);
        assert_eq!(tb.io_timeout(), 20_000_000);
    }

    #[test]
    fn test_rejects_zero_unit() {
        let tb = time_base();
        assert_eq!(tb.set_io_unit(0), Err(Error::InvalidArgument));
        assert_eq!(tb.set_pause_unit(0), Err(Error::InvalidArgument));
        // Unchanged on error
        assert_eq!(tb.unit_ticks(Unit::Io), 80);
        assert_eq!(tb.set_io_unit(160), Ok(()));
        assert_eq!(tb.unit_ticks(Unit::Io), 160);
    }

    #[test]
    fn test_timeout_since_mark() {
        let clock = StepClock::new(1_000);
        let tb = time_base();
        tb.mark(&clock);
        assert!(!tb.timeout(&clock, 10));
        clock.advance(799);
        assert!(!tb.timeout(&clock, 10));
        clock.advance(1);
        assert!(tb.timeout(&clock, 10));
        assert_eq!(tb.elapsed_since_mark(&clock, Unit::Io), 10);
    }

    #[test]
    fn test_wait_is_evenly_spaced() {
        let clock = StepClock::new(0);
        clock.late_by.set(200); // every wake is 2.5 µs late
        let tb = time_base();
        tb.mark(&clock);

        tb.wait(&clock, 1000);
        assert_eq!(tb.marked(), 80_000);
        tb.wait(&clock, 1000);
        assert_eq!(tb.marked(), 160_000);
    }

    #[test]
    fn test_wait_catches_up_at_most_one_period() {
        let clock = StepClock::new(0);
        let tb = time_base();
        tb.mark(&clock);
        // Caller falls three periods behind
        clock.advance(3 * 80_000 + 500);
        tb.wait(&clock, 1000);
        assert_eq!(tb.marked(), clock.ticks());
    }

    #[test]
    fn test_wait_across_counter_wrap() {
        let clock = StepClock::new(u32::MAX - 100);
        let tb = time_base();
        tb.mark(&clock);
        tb.wait(&clock, 10);
        assert_eq!(tb.marked(), (u32::MAX - 100).wrapping_add(800));
    }

    #[test]
    fn test_pause_leaves_mark() {
        let clock = StepClock::new(0);
        let tb = time_base();
        tb.mark(&clock);
        tb.pause(&clock, 3);
        assert_eq!(clock.ticks(), 240_000);
        assert_eq!(tb.marked(), 0);
    }

    #[test]
    fn test_deadline() {
        let clock = StepClock::new(50);
        let tb = time_base();
        tb.set_io_timeout(100);
        let deadline = tb.deadline(&clock);
        assert!(!deadline.expired(149));
        assert!(deadline.expired(150));
        assert!(!Deadline::unbounded(0).expired(u32::MAX / 2));
    }
}
