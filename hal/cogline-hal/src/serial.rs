//! Asynchronous serial settings
//!
//! Value types shared by the bit-banged serial drivers. The frame format
//! is fixed at 8 data bits, no parity, one stop bit.

/// Serial configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Line signalling options
    pub mode: SerialMode,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: 115_200,
            mode: SerialMode::default(),
        }
    }
}

impl SerialConfig {
    pub const fn new(baudrate: u32) -> Self {
        Self {
            baudrate,
            mode: SerialMode::NONE,
        }
    }

    /// Ticks per bit at the given tick rate, `None` for a zero or
    /// unreachable baud rate
    pub fn bit_ticks(&self, ticks_per_second: u32) -> Option<u32> {
        if self.baudrate == 0 || self.baudrate > ticks_per_second {
            return None;
        }
        Some(ticks_per_second / self.baudrate)
    }
}

/// Signalling options for the full-duplex driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialMode {
    /// Receive line idles low and carries inverted bits
    pub invert_rx: bool,
    /// Transmit line idles low and carries inverted bits
    pub invert_tx: bool,
    /// Transmit line only pulls in one direction and floats otherwise
    pub open_drain_tx: bool,
    /// Discard bytes received while transmitting (shared tx/rx wire)
    pub ignore_tx_echo: bool,
}

impl SerialMode {
    pub const NONE: SerialMode = SerialMode {
        invert_rx: false,
        invert_tx: false,
        open_drain_tx: false,
        ignore_tx_echo: false,
    };

    /// Decode the conventional mode bit field
    ///
    /// Bit 0 inverts rx, bit 1 inverts tx, bit 2 selects open-drain tx,
    /// bit 3 ignores the tx echo. Higher bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            invert_rx: bits & 0b0001 != 0,
            invert_tx: bits & 0b0010 != 0,
            open_drain_tx: bits & 0b0100 != 0,
            ignore_tx_echo: bits & 0b1000 != 0,
        }
    }

    pub const fn bits(&self) -> u8 {
        (self.invert_rx as u8)
            | (self.invert_tx as u8) << 1
            | (self.open_drain_tx as u8) << 2
            | (self.ignore_tx_echo as u8) << 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_ticks() {
        let cfg = SerialConfig::new(9600);
        assert_eq!(cfg.bit_ticks(80_000_000), Some(8333));
        assert_eq!(SerialConfig::new(0).bit_ticks(80_000_000), None);
    }

    #[test]
    fn test_mode_bits() {
        let mode = SerialMode::from_bits(0b1010);
        assert!(!mode.invert_rx);
        assert!(mode.invert_tx);
        assert!(!mode.open_drain_tx);
        assert!(mode.ignore_tx_echo);
        assert_eq!(mode.bits(), 0b1010);
    }
}
