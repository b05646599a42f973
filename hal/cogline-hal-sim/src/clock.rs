use std::time::{Duration, Instant};

use cogline_hal::clock::{reached, remaining, TickClock};

use crate::SIM_CLOCK_HZ;

/// Longest remaining wait that is spun rather than slept
const SPIN_WINDOW: Duration = Duration::from_micros(200);

/// Tick counter derived from the host monotonic clock
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    origin: Instant,
    hz: u32,
    offset: u32,
}

impl SimClock {
    pub fn new(hz: u32) -> Self {
        Self::starting_at(hz, 0)
    }

    /// Clock whose counter reads `ticks` right now
    ///
    /// Starting close to `u32::MAX` exercises wrap-around early.
    pub fn starting_at(hz: u32, ticks: u32) -> Self {
        Self {
            origin: Instant::now(),
            hz: hz.max(1),
            offset: ticks,
        }
    }

    fn ticks_to_duration(&self, ticks: u32) -> Duration {
        Duration::from_nanos(u64::from(ticks) * 1_000_000_000 / u64::from(self.hz))
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(SIM_CLOCK_HZ)
    }
}

impl TickClock for SimClock {
    fn ticks(&self) -> u32 {
        let nanos = self.origin.elapsed().as_nanos();
        let ticks = nanos * u128::from(self.hz) / 1_000_000_000;
        (ticks as u32).wrapping_add(self.offset)
    }

    fn ticks_per_second(&self) -> u32 {
        self.hz
    }

    /// Sleep through most of the wait, spin the last stretch
    fn wait_until(&self, target: u32) {
        loop {
            let now = self.ticks();
            if reached(now, target) {
                return;
            }
            let left = self.ticks_to_duration(remaining(now, target));
            if left > SPIN_WINDOW {
                std::thread::sleep(left - SPIN_WINDOW / 2);
            } else {
                std::hint::spin_loop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_advances() {
        let clock = SimClock::default();
        let start = clock.ticks();
        std::thread::sleep(Duration::from_millis(2));
        let elapsed = clock.ticks().wrapping_sub(start);
        assert!(elapsed >= 2 * 80_000, "elapsed {elapsed}");
    }

    #[test]
    fn test_wait_until_reaches_target() {
        let clock = SimClock::default();
        let target = clock.ticks().wrapping_add(clock.ticks_per_ms() * 3);
        clock.wait_until(target);
        assert!(reached(clock.ticks(), target));
    }

    #[test]
    fn test_wait_across_wrap() {
        let clock = SimClock::starting_at(SIM_CLOCK_HZ, u32::MAX - 40_000);
        let target = clock.ticks().wrapping_add(80_000);
        assert!(target < 80_000);
        clock.wait_until(target);
        assert!(reached(clock.ticks(), target));
    }

    #[test]
    fn test_past_target_returns_at_once() {
        let clock = SimClock::default();
        let start = Instant::now();
        clock.wait_until(clock.ticks().wrapping_sub(1_000));
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
