//! Runtime state shared by every driver

use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use cogline_core::config::CoglineConfig;
use cogline_core::generator::{DacWave, PwmWave, SquareWave};
use cogline_core::registry::{DriverId, LineSnapshot, ReleasePolicy};
use cogline_core::time::Unit;
use cogline_core::{LineRegistry, Result, TimeBase, WorkerPool};
use cogline_hal::{Direction, Line, LineIo, Platform, TickClock};

use crate::generator::Generator;

/// State every driver of one runtime refers to
pub struct Shared<P: Platform> {
    pub(crate) platform: P,
    pub(crate) lines: LineRegistry,
    pub(crate) workers: WorkerPool,
    pub(crate) time: TimeBase,
    pub(crate) config: CoglineConfig,
    /// Held while a tone occupies the foreground counter
    pub(crate) tone: Mutex<()>,
    next_driver: AtomicU16,
}

impl<P: Platform> Shared<P> {
    /// Fresh identifier for a foreground stream driver
    pub(crate) fn next_driver_id(&self) -> DriverId {
        DriverId(self.next_driver.fetch_add(1, Ordering::Relaxed))
    }

    /// Current registers of `line`, recorded when it is claimed
    pub(crate) fn snapshot(&self, line: Line) -> LineSnapshot {
        LineSnapshot {
            direction: self.platform.direction(line),
            output: self.platform.output(line),
        }
    }

    /// Put `line` into the state `policy` asks for on release
    pub(crate) fn settle(&self, line: Line, policy: ReleasePolicy) {
        match policy {
            ReleasePolicy::ResetToInput => self.platform.set_direction(line, Direction::Input),
            ReleasePolicy::LeaveDriven => {}
        }
    }

    /// Fail with `AlreadyClaimed` if a claimant holds `line`
    pub(crate) fn ensure_unclaimed(&self, line: Line) -> Result<()> {
        if let Some(owner) = self.lines.owner_of(line) {
            debug!("line {} busy, held by {:?}", line.index(), owner);
            return Err(cogline_core::Error::AlreadyClaimed);
        }
        Ok(())
    }

    /// Block for `ms` milliseconds, one millisecond at a time
    pub(crate) fn delay_ms(&self, ms: u32) {
        let step = self.platform.ticks_per_ms();
        let mut target = self.platform.ticks();
        for _ in 0..ms {
            target = target.wrapping_add(step);
            self.platform.wait_until(target);
        }
    }
}

/// A Cogline runtime bound to one board
///
/// Owns the line registry, the worker pool, the time base and the three
/// generator families. Dropping the runtime stops every generator.
pub struct Cogline<P: Platform> {
    pub(crate) shared: Arc<Shared<P>>,
    pub(crate) pwm: Generator<P, PwmWave>,
    pub(crate) dac: Generator<P, DacWave>,
    pub(crate) square: Generator<P, SquareWave>,
    /// Resolution used when the DAC family is started on demand
    pub(crate) dac_bits: AtomicU8,
}

impl<P: Platform> Cogline<P> {
    /// Create a runtime with the given configuration
    pub fn new(platform: P, config: CoglineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(platform, config))
    }

    /// Create a runtime with the default configuration
    pub fn with_defaults(platform: P) -> Self {
        Self::build(platform, CoglineConfig::default())
    }

    fn build(platform: P, config: CoglineConfig) -> Self {
        let dac_bits = AtomicU8::new(config.dac.resolution_bits);
        let shared = Arc::new(Shared {
            lines: LineRegistry::new(),
            workers: WorkerPool::new(&config.pool),
            time: TimeBase::new(&config.timing, platform.ticks_per_second()),
            config,
            tone: Mutex::new(()),
            next_driver: AtomicU16::new(1),
            platform,
        });
        info!(
            "runtime up, {} workers at {} Hz",
            shared.workers.free_count(),
            shared.platform.ticks_per_second()
        );
        Self {
            pwm: Generator::new(shared.clone()),
            dac: Generator::new(shared.clone()),
            square: Generator::new(shared.clone()),
            dac_bits,
            shared,
        }
    }

    pub fn platform(&self) -> &P {
        &self.shared.platform
    }

    pub fn config(&self) -> &CoglineConfig {
        &self.shared.config
    }

    pub fn lines(&self) -> &LineRegistry {
        &self.shared.lines
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.shared.workers
    }

    pub fn time(&self) -> &TimeBase {
        &self.shared.time
    }

    /// PWM generator family
    pub fn pwm(&self) -> &Generator<P, PwmWave> {
        &self.pwm
    }

    /// Duty-modulated DAC generator family
    pub fn dac(&self) -> &Generator<P, DacWave> {
        &self.dac
    }

    /// Square-wave generator family
    pub fn square_wave(&self) -> &Generator<P, SquareWave> {
        &self.square
    }

    /// Start the PWM family with a cycle of `cycle_us` microseconds
    pub fn start_pwm(&self, cycle_us: u32) -> Result<()> {
        let wave = PwmWave::new(cycle_us, self.shared.platform.ticks_per_second())?;
        self.pwm.start(wave).map(|_| ())
    }

    /// Start the DAC family with `bits` of resolution
    pub fn start_dac(&self, bits: u8) -> Result<()> {
        let mut config = self.shared.config.dac;
        config.resolution_bits = bits;
        let wave = DacWave::new(&config, self.shared.platform.ticks_per_second())?;
        self.dac.start(wave).map(|_| ())
    }

    /// Start the square-wave family
    pub fn start_square_wave(&self) -> Result<()> {
        let wave = SquareWave::new(
            &self.shared.config.square_wave,
            self.shared.platform.ticks_per_second(),
        )?;
        self.square.start(wave).map(|_| ())
    }

    /// Record the current tick count as the reference for `timeout`/`wait`
    pub fn mark(&self) {
        self.shared.time.mark(&self.shared.platform);
    }

    /// Whether `units` I/O units have passed since the last mark
    pub fn timeout(&self, units: u32) -> bool {
        self.shared.time.timeout(&self.shared.platform, units)
    }

    /// Block until `units` I/O units after the last mark and re-mark
    pub fn wait(&self, units: u32) {
        self.shared.time.wait(&self.shared.platform, units);
    }

    /// Block for `n` pause units
    pub fn pause(&self, n: u32) {
        self.shared.time.pause(&self.shared.platform, n);
    }

    /// Time since the last mark in `unit`
    pub fn elapsed_since_mark(&self, unit: Unit) -> u32 {
        self.shared
            .time
            .elapsed_since_mark(&self.shared.platform, unit)
    }
}
