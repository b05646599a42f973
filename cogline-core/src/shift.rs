//! Bit assembly for synchronous shift transfers
//!
//! Transfers are 1 to 32 bits wide. MSB-first sends the highest of the
//! `bits` low bits first; LSB-first sends bit 0 first. The same order
//! rules apply when assembling received bits.

use cogline_hal::BitOrder;

use crate::error::{Error, Result};

/// Widest single transfer
pub const MAX_BITS: u32 = 32;

/// Check a transfer width
pub fn check_width(bits: u32) -> Result<()> {
    if bits == 0 || bits > MAX_BITS {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

/// Value of the `index`-th bit put on the wire when sending `value`
pub fn wire_bit(value: u32, bits: u32, order: BitOrder, index: u32) -> bool {
    let position = match order {
        BitOrder::MsbFirst => bits - 1 - index,
        BitOrder::LsbFirst => index,
    };
    (value >> position) & 1 != 0
}

/// Accumulates received bits into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitAssembler {
    order: BitOrder,
    bits: u32,
    received: u32,
    value: u32,
}

impl BitAssembler {
    pub fn new(bits: u32, order: BitOrder) -> Result<Self> {
        check_width(bits)?;
        Ok(Self {
            order,
            bits,
            received: 0,
            value: 0,
        })
    }

    /// Append the next bit off the wire
    pub fn push(&mut self, bit: bool) {
        if self.is_complete() {
            return;
        }
        let bit = u32::from(bit);
        match self.order {
            BitOrder::MsbFirst => self.value = (self.value << 1) | bit,
            BitOrder::LsbFirst => self.value |= bit << self.received,
        }
        self.received += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.bits
    }

    /// Value assembled so far, right-aligned
    pub fn value(&self) -> u32 {
        self.value
    }
}

/// Mask covering the low `bits` bits
pub fn width_mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn order_strategy() -> impl Strategy<Value = BitOrder> {
        prop_oneof![Just(BitOrder::MsbFirst), Just(BitOrder::LsbFirst)]
    }

    #[test]
    fn test_msb_first_wire_order() {
        // 0xA5 = 1010_0101
        let sent: heapless::Vec<bool, 8> = (0..8)
            .map(|i| wire_bit(0xA5, 8, BitOrder::MsbFirst, i))
            .collect();
        assert_eq!(
            sent.as_slice(),
            &[true, false, true, false, false, true, false, true]
        );
    }

    #[test]
    fn test_lsb_first_assembly() {
        let mut asm = BitAssembler::new(4, BitOrder::LsbFirst).unwrap();
        for bit in [true, false, false, false] {
            asm.push(bit);
        }
        assert!(asm.is_complete());
        assert_eq!(asm.value(), 0b0001);
    }

    #[test]
    fn test_extra_bits_ignored() {
        let mut asm = BitAssembler::new(2, BitOrder::MsbFirst).unwrap();
        for _ in 0..5 {
            asm.push(true);
        }
        assert_eq!(asm.value(), 0b11);
    }

    #[test]
    fn test_width_bounds() {
        assert_eq!(check_width(0), Err(Error::InvalidArgument));
        assert_eq!(check_width(33), Err(Error::InvalidArgument));
        assert!(BitAssembler::new(32, BitOrder::MsbFirst).is_ok());
        assert_eq!(width_mask(32), u32::MAX);
        assert_eq!(width_mask(5), 0x1F);
    }

    proptest! {
        #[test]
        fn prop_sent_bits_reassemble(
            value: u32,
            bits in 1u32..=32,
            order in order_strategy(),
        ) {
            let mut asm = BitAssembler::new(bits, order).unwrap();
            for i in 0..bits {
                asm.push(wire_bit(value, bits, order, i));
            }
            prop_assert_eq!(asm.value(), value & width_mask(bits));
        }
    }
}
