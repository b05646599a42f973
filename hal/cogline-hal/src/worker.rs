//! Background worker execution
//!
//! A worker is an independent processing unit. The host runs one
//! [`WorkerTask`] per worker by calling [`WorkerTask::service`] over and
//! over until the worker is halted. A service call should cover at most
//! one signal period so halting stays prompt.

/// Total processing units on the board, including the foreground one
pub const MAX_WORKERS: usize = 8;

/// Processing unit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WorkerId(u8);

impl WorkerId {
    /// The unit running the caller's own flow of control
    pub const FOREGROUND: WorkerId = WorkerId(0);

    /// Create an id, `None` if out of range
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_WORKERS {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_foreground(self) -> bool {
        self.0 == 0
    }
}

/// Work hosted on a background worker
pub trait WorkerTask: Send + 'static {
    /// Run one iteration (typically one signal period)
    fn service(&mut self);
}

/// Worker launch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LaunchError {
    /// The unit is already running a task
    Busy,
    /// The unit cannot host tasks (e.g. the foreground unit)
    Unavailable,
}

/// Runs tasks on background workers
pub trait WorkerHost {
    /// Start `task` on `worker`
    fn launch<T: WorkerTask>(&self, worker: WorkerId, task: T) -> Result<(), LaunchError>;

    /// Stop the task on `worker`
    ///
    /// Returns once the task's current service call has finished and the
    /// task will never run again. Halting an idle worker is a no-op.
    fn halt(&self, worker: WorkerId);

    /// Whether `worker` currently hosts a task
    fn is_running(&self, worker: WorkerId) -> bool;
}
