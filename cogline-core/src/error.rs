//! Error taxonomy
//!
//! Every fallible operation in the runtime reports one of these codes to
//! its immediate caller. None of them is fatal: shared state is left
//! consistent and the caller may retry after fixing the cause.

use core::fmt;

/// Runtime status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Argument outside its documented domain (unit, line, channel,
    /// duty time, frequency, DAC code, bit count, baud rate)
    InvalidArgument,
    /// Line is owned by another claimant
    AlreadyClaimed,
    /// Requested binding collides with an existing one (other channel of
    /// the same generator, or a line held by someone else during a move)
    Conflict,
    /// No free worker, or the family already runs on one
    ResourceExhausted,
    /// The timeout ceiling elapsed before the expected transition
    Timeout,
    /// Stream handle used after close
    UseAfterClose,
    /// Generator used while not running
    UseAfterStop,
}

impl Error {
    /// Short stable name, useful for logs and status displays
    pub const fn as_str(&self) -> &'static str {
        match self {
            Error::InvalidArgument => "invalid argument",
            Error::AlreadyClaimed => "line already claimed",
            Error::Conflict => "line conflict",
            Error::ResourceExhausted => "no free worker",
            Error::Timeout => "timed out",
            Error::UseAfterClose => "stream closed",
            Error::UseAfterStop => "generator stopped",
        }
    }

    /// Whether the error reports a normal absence of signal rather than a
    /// misuse or contention problem
    pub const fn is_timing(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<cogline_hal::gpio::InvalidLine> for Error {
    fn from(_: cogline_hal::gpio::InvalidLine) -> Self {
        Error::InvalidArgument
    }
}

#[cfg(feature = "embedded-io")]
impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;
        match self {
            Error::InvalidArgument => ErrorKind::InvalidInput,
            Error::Timeout => ErrorKind::TimedOut,
            Error::UseAfterClose | Error::UseAfterStop => ErrorKind::NotConnected,
            Error::AlreadyClaimed | Error::Conflict | Error::ResourceExhausted => ErrorKind::Other,
        }
    }
}

/// Result alias used throughout the runtime
pub type Result<T, E = Error> = core::result::Result<T, E>;
