use std::sync::Arc;

use parking_lot::Mutex;

use cogline_hal::{
    CounterBank, CounterMode, CounterSlot, Direction, Level, Line, LineIo, TickClock, WorkerHost,
    WorkerId, WorkerTask, LaunchError, MAX_WORKERS,
};

use crate::clock::SimClock;
use crate::device::Device;
use crate::worker::WorkerThreads;

/// One running counter module
#[derive(Debug, Clone, Copy)]
struct Counter {
    line: Line,
    mode: CounterMode,
    since: u32,
}

impl Counter {
    /// Counter output `elapsed` ticks after it was configured
    fn output(&self, now: u32) -> bool {
        let elapsed = u64::from(now.wrapping_sub(self.since));
        match self.mode {
            CounterMode::Off => false,
            CounterMode::Nco { frq } => (u64::from(frq) * elapsed) >> 31 & 1 == 1,
            CounterMode::Pll { frq, divider } => {
                let vco = u128::from(frq) * u128::from(elapsed) * 16;
                (vco >> (7 - u32::from(divider.min(7)))) >> 31 & 1 == 1
            }
            CounterMode::DutySingleEnded { frq } => {
                if elapsed == 0 {
                    return false;
                }
                let frq = u64::from(frq);
                (frq * elapsed) >> 32 != (frq * (elapsed - 1)) >> 32
            }
            CounterMode::Pulse { high_ticks } => elapsed < u64::from(high_ticks),
        }
    }
}

/// Register file: directions, outputs and counters
#[derive(Debug, Default)]
struct Registers {
    dir: u32,
    out: u32,
    counters: [[Option<Counter>; 2]; MAX_WORKERS],
}

/// Read-only view of the chip side of the lines at one instant
///
/// Handed to [`Device`]s so they can react to what the chip drives.
pub struct Pins<'a> {
    regs: &'a Registers,
    now: u32,
}

impl Pins<'_> {
    pub fn now(&self) -> u32 {
        self.now
    }

    pub fn is_output(&self, line: Line) -> bool {
        self.regs.dir & line.mask() != 0
    }

    /// Level the chip drives on `line`, `None` while it is an input
    pub fn driven(&self, line: Line) -> Option<Level> {
        if !self.is_output(line) {
            return None;
        }
        let counter_high = self
            .regs
            .counters
            .iter()
            .flatten()
            .flatten()
            .any(|c| c.line == line && c.output(self.now));
        Some(Level::from(self.regs.out & line.mask() != 0 || counter_high))
    }
}

struct Bank {
    regs: Registers,
    devices: Vec<Box<dyn Device>>,
}

impl Bank {
    /// Let every device see the registers after a write
    fn notify(&mut self, now: u32) {
        let Bank { regs, devices } = self;
        let pins = Pins { regs, now };
        for device in devices.iter_mut() {
            device.on_change(&pins);
        }
    }
}

struct Inner {
    clock: SimClock,
    bank: Mutex<Bank>,
    workers: WorkerThreads,
}

/// Simulated board
///
/// Cheap to clone; every clone refers to the same registers, devices and
/// workers. Input lines read low unless an attached device drives them.
#[derive(Clone)]
pub struct SimBoard {
    inner: Arc<Inner>,
}

impl SimBoard {
    /// Board with the default 80 MHz clock
    pub fn new() -> Self {
        Self::with_clock(SimClock::default())
    }

    pub fn with_clock(clock: SimClock) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                bank: Mutex::new(Bank {
                    regs: Registers::default(),
                    devices: Vec::new(),
                }),
                workers: WorkerThreads::new(),
            }),
        }
    }

    pub fn clock(&self) -> &SimClock {
        &self.inner.clock
    }

    /// Connect a device to the lines
    pub fn attach(&self, device: impl Device + 'static) {
        let now = self.inner.clock.ticks();
        let mut bank = self.inner.bank.lock();
        bank.devices.push(Box::new(device));
        bank.notify(now);
    }

    /// Disconnect every device
    pub fn detach_all(&self) {
        self.inner.bank.lock().devices.clear();
    }

    /// Current configuration of one counter module
    pub fn counter(&self, worker: WorkerId, slot: CounterSlot) -> Option<(Line, CounterMode)> {
        self.inner.bank.lock().regs.counters[worker.index()][slot.index()]
            .map(|c| (c.line, c.mode))
    }

    fn write(&self, update: impl FnOnce(&mut Registers)) {
        let now = self.inner.clock.ticks();
        let mut bank = self.inner.bank.lock();
        update(&mut bank.regs);
        bank.notify(now);
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl LineIo for SimBoard {
    fn set_direction(&self, line: Line, direction: Direction) {
        self.write(|regs| match direction {
            Direction::Output => regs.dir |= line.mask(),
            Direction::Input => regs.dir &= !line.mask(),
        });
    }

    fn direction(&self, line: Line) -> Direction {
        if self.inner.bank.lock().regs.dir & line.mask() != 0 {
            Direction::Output
        } else {
            Direction::Input
        }
    }

    fn set_output(&self, line: Line, level: Level) {
        self.write(|regs| match level {
            Level::High => regs.out |= line.mask(),
            Level::Low => regs.out &= !line.mask(),
        });
    }

    fn output(&self, line: Line) -> Level {
        Level::from(self.inner.bank.lock().regs.out & line.mask() != 0)
    }

    fn level(&self, line: Line) -> Level {
        let now = self.inner.clock.ticks();
        let bank = self.inner.bank.lock();
        let pins = Pins {
            regs: &bank.regs,
            now,
        };
        if let Some(level) = pins.driven(line) {
            return level;
        }
        bank.devices
            .iter()
            .find_map(|device| device.drive(line, &pins))
            .unwrap_or(Level::Low)
    }
}

impl TickClock for SimBoard {
    fn ticks(&self) -> u32 {
        self.inner.clock.ticks()
    }

    fn ticks_per_second(&self) -> u32 {
        self.inner.clock.ticks_per_second()
    }

    fn wait_until(&self, target: u32) {
        self.inner.clock.wait_until(target);
    }
}

impl CounterBank for SimBoard {
    fn configure(&self, worker: WorkerId, slot: CounterSlot, line: Line, mode: CounterMode) {
        self.write(|regs| {
            regs.counters[worker.index()][slot.index()] = match mode {
                CounterMode::Off => None,
                mode => Some(Counter {
                    line,
                    mode,
                    since: self.inner.clock.ticks(),
                }),
            };
        });
    }

    fn disable(&self, worker: WorkerId, slot: CounterSlot) {
        self.write(|regs| regs.counters[worker.index()][slot.index()] = None);
    }
}

impl WorkerHost for SimBoard {
    fn launch<T: WorkerTask>(&self, worker: WorkerId, task: T) -> Result<(), LaunchError> {
        self.inner.workers.launch(worker, task)
    }

    fn halt(&self, worker: WorkerId) {
        self.inner.workers.halt(worker);
    }

    fn is_running(&self, worker: WorkerId) -> bool {
        self.inner.workers.is_running(worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(i: u8) -> Line {
        Line::new(i).unwrap()
    }

    #[test]
    fn test_registers() {
        let board = SimBoard::new();
        assert_eq!(board.direction(line(4)), Direction::Input);
        assert_eq!(board.level(line(4)), Level::Low);

        board.high(line(4));
        assert_eq!(board.direction(line(4)), Direction::Output);
        assert_eq!(board.level(line(4)), Level::High);

        board.set_direction(line(4), Direction::Input);
        assert_eq!(board.output(line(4)), Level::High);
        assert_eq!(board.level(line(4)), Level::Low);
    }

    #[test]
    fn test_pulse_counter_ends() {
        let board = SimBoard::new();
        let worker = WorkerId::new(1).unwrap();
        board.set_direction(line(2), Direction::Output);
        board.configure(
            worker,
            CounterSlot::A,
            line(2),
            CounterMode::Pulse {
                high_ticks: 80_000,
            },
        );
        assert_eq!(board.level(line(2)), Level::High);
        board.delay_ticks(160_000);
        assert_eq!(board.level(line(2)), Level::Low);

        board.disable_all(worker);
        assert_eq!(board.counter(worker, CounterSlot::A), None);
    }

    #[test]
    fn test_counter_output_models() {
        let nco = Counter {
            line: line(0),
            mode: CounterMode::Nco { frq: 1 << 30 },
            since: 0,
        };
        // a quarter turn per tick: two ticks low, two high
        let wave: Vec<bool> = (0..8).map(|t| nco.output(t)).collect();
        assert_eq!(wave, [false, false, true, true, false, false, true, true]);

        let duty = Counter {
            line: line(0),
            mode: CounterMode::DutySingleEnded { frq: 1 << 31 },
            since: 0,
        };
        let high = (1..=1000).filter(|t| duty.output(*t)).count();
        assert_eq!(high, 500);

        let pulse = Counter {
            line: line(0),
            mode: CounterMode::Pulse { high_ticks: 3 },
            since: u32::MAX,
        };
        assert!(pulse.output(1));
        assert!(!pulse.output(2));
    }
}
