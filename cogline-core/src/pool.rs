//! Worker pool
//!
//! Tracks which background processing units are free and what each busy
//! one is running. Unit 0 is the foreground and never handed out; the
//! pool allocates from units `1..=workers`. Each generator family (and
//! the full-duplex receiver) runs on at most one unit at a time.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

use cogline_hal::{WorkerId, MAX_WORKERS};

use crate::config::PoolConfig;
use crate::error::{Error, Result};

/// What a busy worker is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WorkerKind {
    Pwm,
    Dac,
    SquareWave,
    FullDuplexSerial,
}

impl WorkerKind {
    /// Whether at most one worker of this kind may run at a time
    pub const fn is_exclusive(self) -> bool {
        !matches!(self, WorkerKind::FullDuplexSerial)
    }
}

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WorkerState {
    #[default]
    Free,
    Running(WorkerKind),
    /// Not available on this board configuration
    Reserved,
}

/// Fixed set of background processing units
pub struct WorkerPool {
    states: CriticalSectionMutex<RefCell<[WorkerState; MAX_WORKERS]>>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

impl WorkerPool {
    /// Create a pool with `config.workers` allocatable units
    pub fn new(config: &PoolConfig) -> Self {
        let available = usize::from(config.workers).min(MAX_WORKERS - 1);
        let mut states = [WorkerState::Free; MAX_WORKERS];
        for (index, state) in states.iter_mut().enumerate() {
            if index == 0 || index > available {
                *state = WorkerState::Reserved;
            }
        }
        Self {
            states: CriticalSectionMutex::new(RefCell::new(states)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut [WorkerState; MAX_WORKERS]) -> R) -> R {
        self.states.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Take a free unit for `kind`
    ///
    /// Fails with `ResourceExhausted` if every unit is busy or if `kind`
    /// is exclusive and already running somewhere.
    pub fn allocate(&self, kind: WorkerKind) -> Result<WorkerId> {
        self.with(|states| {
            if kind.is_exclusive() && states.contains(&WorkerState::Running(kind)) {
                debug!("{:?} already running", kind);
                return Err(Error::ResourceExhausted);
            }
            let index = states
                .iter()
                .position(|state| *state == WorkerState::Free)
                .ok_or(Error::ResourceExhausted)?;
            states[index] = WorkerState::Running(kind);
            // Index is below MAX_WORKERS by construction
            WorkerId::new(index as u8).ok_or(Error::ResourceExhausted)
        })
        .map_err(|e| {
            warn!("no worker for {:?}", kind);
            e
        })
    }

    /// Return a unit to the pool (idempotent)
    pub fn free(&self, worker: WorkerId) {
        self.with(|states| {
            let state = &mut states[worker.index()];
            if matches!(state, WorkerState::Running(_)) {
                *state = WorkerState::Free;
            }
        })
    }

    /// State of one unit
    pub fn state(&self, worker: WorkerId) -> WorkerState {
        self.with(|states| states[worker.index()])
    }

    pub fn is_free(&self, worker: WorkerId) -> bool {
        self.state(worker) == WorkerState::Free
    }

    /// Unit currently running `kind`, if any
    pub fn running(&self, kind: WorkerKind) -> Option<WorkerId> {
        self.with(|states| {
            states
                .iter()
                .position(|state| *state == WorkerState::Running(kind))
                .and_then(|index| WorkerId::new(index as u8))
        })
    }

    /// Number of units that can still be allocated
    pub fn free_count(&self) -> usize {
        self.with(|states| states.iter().filter(|s| **s == WorkerState::Free).count())
    }

    /// Number of units currently running something
    pub fn busy_count(&self) -> usize {
        self.with(|states| {
            states
                .iter()
                .filter(|s| matches!(s, WorkerState::Running(_)))
                .count()
        })
    }
}
