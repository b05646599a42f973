use std::sync::Arc;

use embedded_io::{ErrorType, Read, Write};
use heapless::Deque;
use parking_lot::Mutex;

use cogline_core::config::MAX_RX_BUFFER;
use cogline_core::registry::{Claimant, ReleasePolicy};
use cogline_core::{Error, Result, WorkerKind};
use cogline_hal::clock::reached;
use cogline_hal::{
    Direction, Line, LineIo, Platform, SerialConfig, TickClock, WorkerHost, WorkerId, WorkerTask,
};

use super::{distinct, RxLine, TxLine};
use crate::runtime::{Cogline, Shared};

/// Bytes received by the worker and not yet read
struct RxBuffer {
    bytes: Deque<u8, MAX_RX_BUFFER>,
    capacity: usize,
    overruns: u32,
    muted: bool,
}

impl RxBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            bytes: Deque::new(),
            capacity: capacity.clamp(1, MAX_RX_BUFFER),
            overruns: 0,
            muted: false,
        }
    }

    fn push(&mut self, byte: u8) {
        if self.muted {
            return;
        }
        if self.bytes.len() >= self.capacity || self.bytes.push_back(byte).is_err() {
            self.overruns = self.overruns.saturating_add(1);
        }
    }

    fn drain_into(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        while count < buf.len() {
            match self.bytes.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }
}

/// Worker task sampling the receive line
struct RxJob<P> {
    platform: P,
    rx: RxLine,
    bit_ticks: u32,
    buffer: Arc<Mutex<RxBuffer>>,
}

impl<P: Platform> WorkerTask for RxJob<P> {
    /// Watch for a start bit for up to one bit time, then take a frame
    fn service(&mut self) {
        let platform = &self.platform;
        let poll = (self.bit_ticks / 8).max(1);
        let give_up = platform.ticks().wrapping_add(self.bit_ticks);

        let start = loop {
            let now = platform.ticks();
            if !self.rx.is_mark(platform) {
                break now;
            }
            if reached(now, give_up) {
                return;
            }
            platform.wait_until(now.wrapping_add(poll));
        };

        match self.rx.sample_frame(platform, start, self.bit_ticks) {
            Some(byte) => self.buffer.lock().push(byte),
            None => trace!("full-duplex framing error"),
        }
    }
}

/// Full-duplex 8N1 serial
///
/// A worker samples the receive line into a bounded buffer; writes are
/// timed from the caller's flow of control. When the buffer is full,
/// further bytes are dropped and counted as overruns.
pub struct FullDuplex<P: Platform> {
    shared: Arc<Shared<P>>,
    tx: TxLine,
    rx: RxLine,
    worker: WorkerId,
    config: SerialConfig,
    bit_ticks: u32,
    buffer: Arc<Mutex<RxBuffer>>,
    open: bool,
}

impl<P: Platform> Cogline<P> {
    /// Open a full-duplex serial stream, taking a worker for the receiver
    pub fn open_full_duplex(
        &self,
        tx: Line,
        rx: Line,
        config: SerialConfig,
    ) -> Result<FullDuplex<P>> {
        FullDuplex::open(self.shared.clone(), tx, rx, config)
    }
}

impl<P: Platform> FullDuplex<P> {
    fn open(shared: Arc<Shared<P>>, tx: Line, rx: Line, config: SerialConfig) -> Result<Self> {
        let platform = &shared.platform;
        let bit_ticks = config
            .bit_ticks(platform.ticks_per_second())
            .ok_or(Error::InvalidArgument)?;

        let worker = shared.workers.allocate(WorkerKind::FullDuplexSerial)?;
        let claimant = Claimant::Worker(worker);
        let claims: heapless::Vec<_, 2> = distinct(&[Some(tx), Some(rx)])
            .iter()
            .map(|line| (*line, shared.snapshot(*line)))
            .collect();
        if let Err(e) = shared.lines.claim_all(&claims, claimant) {
            shared.workers.free(worker);
            return Err(e);
        }

        let tx_line = TxLine {
            line: tx,
            invert: config.mode.invert_tx,
            open_drain: config.mode.open_drain_tx,
        };
        let rx_line = RxLine {
            line: rx,
            invert: config.mode.invert_rx,
        };
        if tx != rx {
            platform.set_direction(rx, Direction::Input);
        }
        tx_line.engage(platform);

        let buffer = Arc::new(Mutex::new(RxBuffer::new(shared.config.serial.rx_buffer)));
        let job = RxJob {
            platform: platform.clone(),
            rx: rx_line,
            bit_ticks,
            buffer: buffer.clone(),
        };
        if let Err(e) = platform.launch(worker, job) {
            warn!("full-duplex launch on worker {} failed: {:?}", worker.index(), e);
            shared.lines.release_all_of(claimant);
            shared.workers.free(worker);
            return Err(Error::ResourceExhausted);
        }

        info!(
            "full-duplex open on worker {} at {} baud",
            worker.index(),
            config.baudrate
        );
        Ok(Self {
            shared,
            tx: tx_line,
            rx: rx_line,
            worker,
            config,
            bit_ticks,
            buffer,
            open: true,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::UseAfterClose)
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn config(&self) -> SerialConfig {
        self.config
    }

    /// Worker hosting the receiver
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn rx_line(&self) -> Line {
        self.rx.line
    }

    /// Bytes waiting to be read
    pub fn available(&self) -> usize {
        self.buffer.lock().bytes.len()
    }

    /// Bytes dropped because the buffer was full
    pub fn overruns(&self) -> u32 {
        self.buffer.lock().overruns
    }

    /// Discard buffered bytes
    pub fn clear_rx(&self) {
        self.buffer.lock().bytes.clear();
    }

    /// Halt the receiver and release the lines and worker (idempotent)
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let platform = &self.shared.platform;
        platform.halt(self.worker);
        for line in self.shared.lines.release_all_of(Claimant::Worker(self.worker)) {
            self.shared.settle(line, ReleasePolicy::LeaveDriven);
        }
        self.shared.workers.free(self.worker);
        info!("full-duplex closed, worker {} free", self.worker.index());
    }
}

impl<P: Platform> Drop for FullDuplex<P> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<P: Platform> ErrorType for FullDuplex<P> {
    type Error = Error;
}

impl<P: Platform> Read for FullDuplex<P> {
    /// Take buffered bytes, waiting up to the timeout ceiling for the first
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let platform = &self.shared.platform;
        let deadline = self.shared.time.deadline(platform);
        loop {
            let count = self.buffer.lock().drain_into(buf);
            if count > 0 {
                return Ok(count);
            }
            let now = platform.ticks();
            if deadline.expired(now) {
                return Err(Error::Timeout);
            }
            platform.wait_until(now.wrapping_add(self.bit_ticks));
        }
    }
}

impl<P: Platform> Write for FullDuplex<P> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        let platform = &self.shared.platform;
        let mute = self.config.mode.ignore_tx_echo;
        if mute {
            self.buffer.lock().muted = true;
        }
        for byte in buf {
            self.tx.send_frame(platform, *byte, self.bit_ticks);
        }
        if mute {
            self.buffer.lock().muted = false;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.check_open()
    }
}
