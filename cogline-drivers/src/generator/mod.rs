//! Background signal generators
//!
//! Each family (PWM, DAC, square wave) runs as one [`GeneratorJob`] on a
//! worker taken from the pool. The caller and the job only share the
//! [`ChannelBank`]; the job locks it at the top of each period, applies
//! whatever changed, unlocks, and sleeps until the next period.
//!
//! ```text
//!   caller                         worker
//!   ──────                         ──────
//!   set_channel ─► ChannelBank ◄── service() every period
//!   stop ────────► host.halt ────► (current service call ends)
//! ```

mod freqout;

use std::sync::Arc;

use parking_lot::Mutex;

use cogline_core::generator::{ChannelBank, ChannelSetting, GeneratorState, Waveform, CHANNELS};
use cogline_core::registry::{Claimant, ReleasePolicy};
use cogline_core::{Error, Result};
use cogline_hal::clock::reached;
use cogline_hal::{
    CounterBank, CounterSlot, Direction, Line, LineIo, Platform, TickClock, WorkerHost, WorkerId,
    WorkerTask,
};

use crate::runtime::Shared;

struct Control<W> {
    state: GeneratorState,
    worker: Option<WorkerId>,
    wave: Option<W>,
}

/// One generator family
///
/// `start`, `set_channel` and `stop` are serialized on an internal lock;
/// the worker never takes that lock, so `stop` can wait for it safely.
pub struct Generator<P: Platform, W: Waveform> {
    shared: Arc<Shared<P>>,
    control: Mutex<Control<W>>,
    bank: Arc<Mutex<ChannelBank>>,
}

impl<P: Platform, W: Waveform> Generator<P, W> {
    pub(crate) fn new(shared: Arc<Shared<P>>) -> Self {
        Self {
            shared,
            control: Mutex::new(Control {
                state: GeneratorState::Stopped,
                worker: None,
                wave: None,
            }),
            bank: Arc::new(Mutex::new(ChannelBank::new())),
        }
    }

    /// Launch the family on a free worker with both channels unbound
    ///
    /// Fails with `ResourceExhausted` if the family is already running or
    /// the pool has no free worker.
    pub fn start(&self, wave: W) -> Result<WorkerId> {
        let mut control = self.control.lock();
        if control.state != GeneratorState::Stopped {
            debug!("{:?} start refused, already {:?}", W::KIND, control.state);
            return Err(Error::ResourceExhausted);
        }
        control.state = GeneratorState::Starting;

        let worker = match self.shared.workers.allocate(W::KIND) {
            Ok(worker) => worker,
            Err(e) => {
                control.state = GeneratorState::Stopped;
                return Err(e);
            }
        };

        *self.bank.lock() = ChannelBank::new();
        let job = GeneratorJob::new(self.shared.platform.clone(), worker, wave, self.bank.clone());
        if let Err(e) = self.shared.platform.launch(worker, job) {
            warn!("{:?} launch on worker {} failed: {:?}", W::KIND, worker.index(), e);
            self.shared.workers.free(worker);
            control.state = GeneratorState::Stopped;
            return Err(Error::ResourceExhausted);
        }

        control.worker = Some(worker);
        control.wave = Some(wave);
        control.state = GeneratorState::Running;
        info!("{:?} started on worker {}", W::KIND, worker.index());
        Ok(worker)
    }

    /// Bind `channel` to `line` with `param`, or unbind it with `None`
    ///
    /// Moving a channel to another line puts the previous line back to
    /// input right away; the new setting takes effect within one period.
    pub fn set_channel(&self, channel: usize, line: Option<Line>, param: u32) -> Result<()> {
        ChannelBank::check_channel(channel)?;
        let control = self.control.lock();
        let (worker, wave) = match (control.state, control.worker, control.wave) {
            (GeneratorState::Running, Some(worker), Some(wave)) => (worker, wave),
            _ => return Err(Error::UseAfterStop),
        };
        if line.is_some() {
            wave.validate(param)?;
        }

        let claimant = Claimant::Worker(worker);
        let platform = &self.shared.platform;
        let mut bank = self.bank.lock();
        let previous = bank.requested(channel).line;

        if let Some(line) = line {
            if bank.bound_elsewhere(channel, line) {
                return Err(Error::Conflict);
            }
            if previous != Some(line) {
                self.shared
                    .lines
                    .claim(line, claimant, self.shared.snapshot(line))
                    .map_err(|_| Error::Conflict)?;
            }
        }

        if let Some(old) = previous.filter(|old| Some(*old) != line) {
            if let Some(slot) = CounterSlot::for_channel(channel) {
                platform.disable(worker, slot);
            }
            self.shared.settle(old, ReleasePolicy::ResetToInput);
            self.shared.lines.release_if(old, claimant);
            trace!("channel {} let go of line {}", channel, old.index());
        }

        bank.request(channel, ChannelSetting::new(line, param));
        Ok(())
    }

    /// Halt the worker, turn its counters off, put bound lines back to
    /// input and release them and the worker. Idempotent.
    pub fn stop(&self) {
        let mut control = self.control.lock();
        let Some(worker) = control.worker else {
            return;
        };
        control.state = GeneratorState::Stopping;

        let platform = &self.shared.platform;
        platform.halt(worker);
        platform.disable_all(worker);

        self.bank.lock().clear();
        for line in self.shared.lines.release_all_of(Claimant::Worker(worker)) {
            self.shared.settle(line, ReleasePolicy::ResetToInput);
        }
        self.shared.workers.free(worker);

        control.worker = None;
        control.wave = None;
        control.state = GeneratorState::Stopped;
        info!("{:?} stopped, worker {} free", W::KIND, worker.index());
    }

    pub fn state(&self) -> GeneratorState {
        self.control.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Worker the family runs on, if running
    pub fn worker(&self) -> Option<WorkerId> {
        self.control.lock().worker
    }

    /// Waveform settings the family was started with
    pub fn wave(&self) -> Option<W> {
        self.control.lock().wave
    }

    /// Requested and applied settings of `channel`
    pub fn channel(&self, channel: usize) -> Result<(ChannelSetting, ChannelSetting)> {
        ChannelBank::check_channel(channel)?;
        let bank = self.bank.lock();
        Ok((bank.requested(channel), bank.applied(channel)))
    }
}

impl<P: Platform, W: Waveform> Drop for Generator<P, W> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker side of a generator family
pub struct GeneratorJob<P, W> {
    platform: P,
    worker: WorkerId,
    wave: W,
    bank: Arc<Mutex<ChannelBank>>,
    next: u32,
}

impl<P: Platform, W: Waveform> GeneratorJob<P, W> {
    fn new(platform: P, worker: WorkerId, wave: W, bank: Arc<Mutex<ChannelBank>>) -> Self {
        let next = platform.ticks();
        Self {
            platform,
            worker,
            wave,
            bank,
            next,
        }
    }

    fn apply(&self, bank: &mut ChannelBank) {
        for channel in 0..CHANNELS {
            let Some(slot) = CounterSlot::for_channel(channel) else {
                continue;
            };
            let pending = bank.is_pending(channel);
            if !pending && !W::RETRIGGER {
                continue;
            }
            let setting = bank.requested(channel);
            match setting.line {
                Some(line) => {
                    if pending {
                        self.platform.set_direction(line, Direction::Output);
                    }
                    let mode = self.wave.counter_mode(setting.param);
                    self.platform.configure(self.worker, slot, line, mode);
                }
                None => self.platform.disable(self.worker, slot),
            }
            bank.mark_applied(channel);
        }
    }
}

impl<P: Platform, W: Waveform> WorkerTask for GeneratorJob<P, W> {
    fn service(&mut self) {
        {
            let mut bank = self.bank.lock();
            self.apply(&mut bank);
        }

        self.next = self.next.wrapping_add(self.wave.period_ticks());
        if reached(self.platform.ticks(), self.next) {
            // Fell behind; restart the cadence from now
            self.next = self.platform.ticks();
        } else {
            self.platform.wait_until(self.next);
        }
    }
}
