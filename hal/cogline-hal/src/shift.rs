//! Synchronous shift settings
//!
//! Bit order and sampling edge for clocked serial transfers. The clock
//! idles low and every bit is one high pulse.

/// Order bits travel on the data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Least significant bit first
    LsbFirst,
    /// Most significant bit first
    MsbFirst,
}

impl BitOrder {
    /// Decode the conventional transmit code (0 = LSB first, 1 = MSB first)
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(BitOrder::LsbFirst),
            1 => Some(BitOrder::MsbFirst),
            _ => None,
        }
    }
}

/// When the receiver samples the data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleEdge {
    /// Sample before the clock pulse
    Pre,
    /// Sample after the clock pulse
    Post,
}

/// Receive mode (bit order and sampling edge combined)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ShiftInMode {
    /// MSB first, sample before clock
    MsbPre,
    /// LSB first, sample before clock
    LsbPre,
    /// MSB first, sample after clock
    MsbPost,
    /// LSB first, sample after clock
    LsbPost,
}

impl ShiftInMode {
    /// Decode the conventional receive code (0..=3 in the order above)
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ShiftInMode::MsbPre),
            1 => Some(ShiftInMode::LsbPre),
            2 => Some(ShiftInMode::MsbPost),
            3 => Some(ShiftInMode::LsbPost),
            _ => None,
        }
    }

    pub const fn order(self) -> BitOrder {
        match self {
            ShiftInMode::MsbPre | ShiftInMode::MsbPost => BitOrder::MsbFirst,
            ShiftInMode::LsbPre | ShiftInMode::LsbPost => BitOrder::LsbFirst,
        }
    }

    pub const fn edge(self) -> SampleEdge {
        match self {
            ShiftInMode::MsbPre | ShiftInMode::LsbPre => SampleEdge::Pre,
            ShiftInMode::MsbPost | ShiftInMode::LsbPost => SampleEdge::Post,
        }
    }
}

impl From<ShiftInMode> for (BitOrder, SampleEdge) {
    fn from(mode: ShiftInMode) -> Self {
        (mode.order(), mode.edge())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_codes() {
        assert_eq!(ShiftInMode::from_code(0), Some(ShiftInMode::MsbPre));
        assert_eq!(ShiftInMode::from_code(3), Some(ShiftInMode::LsbPost));
        assert_eq!(ShiftInMode::from_code(4), None);
        assert_eq!(BitOrder::from_code(1), Some(BitOrder::MsbFirst));
    }

    #[test]
    fn test_mode_split() {
        let (order, edge) = ShiftInMode::LsbPost.into();
        assert_eq!(order, BitOrder::LsbFirst);
        assert_eq!(edge, SampleEdge::Post);
    }
}
