use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use cogline_hal::{LaunchError, WorkerId, WorkerTask, MAX_WORKERS};

struct Running {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Running {
    fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// One OS thread per busy worker
pub(crate) struct WorkerThreads {
    slots: Mutex<[Option<Running>; MAX_WORKERS]>,
}

impl WorkerThreads {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(Default::default()),
        }
    }

    pub(crate) fn launch<T: WorkerTask>(
        &self,
        worker: WorkerId,
        mut task: T,
    ) -> Result<(), LaunchError> {
        if worker.is_foreground() {
            return Err(LaunchError::Unavailable);
        }
        let mut slots = self.slots.lock();
        let slot = &mut slots[worker.index()];
        if slot.as_ref().is_some_and(Running::is_alive) {
            return Err(LaunchError::Busy);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name(format!("worker-{}", worker.index()))
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    task.service();
                }
            })
            .map_err(|e| {
                log::error!("failed to spawn worker {}: {e}", worker.index());
                LaunchError::Unavailable
            })?;

        log::debug!("worker {} launched", worker.index());
        *slot = Some(Running { stop, handle });
        Ok(())
    }

    pub(crate) fn halt(&self, worker: WorkerId) {
        // Joined outside the lock so the task can still launch or query
        let running = self.slots.lock()[worker.index()].take();
        if let Some(running) = running {
            running.stop.store(true, Ordering::Release);
            if running.handle.join().is_err() {
                log::warn!("worker {} task panicked", worker.index());
            }
            log::debug!("worker {} halted", worker.index());
        }
    }

    pub(crate) fn is_running(&self, worker: WorkerId) -> bool {
        self.slots.lock()[worker.index()]
            .as_ref()
            .is_some_and(Running::is_alive)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    struct Counting(Arc<AtomicU32>);

    impl WorkerTask for Counting {
        fn service(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
            thread::sleep(std::time::Duration::from_micros(100));
        }
    }

    fn worker(i: u8) -> WorkerId {
        WorkerId::new(i).unwrap()
    }

    #[test]
    fn test_launch_halt_relaunch() {
        let threads = WorkerThreads::new();
        let calls = Arc::new(AtomicU32::new(0));

        threads.launch(worker(2), Counting(calls.clone())).unwrap();
        assert!(threads.is_running(worker(2)));
        assert_eq!(
            threads.launch(worker(2), Counting(calls.clone())),
            Err(LaunchError::Busy)
        );

        thread::sleep(std::time::Duration::from_millis(5));
        threads.halt(worker(2));
        assert!(!threads.is_running(worker(2)));
        let after_halt = calls.load(Ordering::Relaxed);
        assert!(after_halt > 0);
        thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(calls.load(Ordering::Relaxed), after_halt);

        threads.launch(worker(2), Counting(calls)).unwrap();
        threads.halt(worker(2));
    }

    #[test]
    fn test_foreground_unavailable() {
        let threads = WorkerThreads::new();
        let calls = Arc::new(AtomicU32::new(0));
        assert_eq!(
            threads.launch(WorkerId::FOREGROUND, Counting(calls)),
            Err(LaunchError::Unavailable)
        );
    }

    #[test]
    fn test_halt_idle_is_noop() {
        let threads = WorkerThreads::new();
        threads.halt(worker(5));
        assert!(!threads.is_running(worker(5)));
    }
}
