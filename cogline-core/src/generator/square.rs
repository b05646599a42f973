//! Square-wave waveform
//!
//! Below 500 kHz a counter in NCO mode toggles its output at the
//! requested rate directly: `frq = f * 2^32 / clk`.
//!
//! From 500 kHz up to 128 MHz the counter runs in PLL mode. The PLL
//! multiplies the NCO rate by 16 to a VCO that must sit in 64..=128 MHz,
//! then divides the VCO by `2^(7 - divider)` to reach the output. The
//! divider is picked so the VCO lands in range, and the NCO runs at
//! `VCO / 16`.

use cogline_hal::CounterMode;

use super::Waveform;
use crate::config::SquareWaveConfig;
use crate::error::{Error, Result};
use crate::pool::WorkerKind;

/// Lowest frequency the PLL path is used for
pub const PLL_THRESHOLD_HZ: u32 = 500_000;

/// Highest supported output frequency
pub const MAX_FREQUENCY_HZ: u32 = 128_000_000;

const VCO_MIN_HZ: u64 = 64_000_000;
const VCO_MAX_HZ: u64 = 128_000_000;
const PLL_MULTIPLIER: u64 = 16;

/// Counter setup producing a square wave of `hz` on a `clk_hz` clock
pub fn counter_mode_for(hz: u32, clk_hz: u32) -> Result<CounterMode> {
    if hz == 0 || hz > MAX_FREQUENCY_HZ || clk_hz == 0 {
        return Err(Error::InvalidArgument);
    }

    if hz < PLL_THRESHOLD_HZ {
        return Ok(CounterMode::Nco {
            frq: frq_for(u64::from(hz), clk_hz)?,
        });
    }

    let (divider, vco) = (0u8..=7)
        .map(|divider| (divider, u64::from(hz) << (7 - divider)))
        .find(|(_, vco)| (VCO_MIN_HZ..=VCO_MAX_HZ).contains(vco))
        .ok_or(Error::InvalidArgument)?;

    Ok(CounterMode::Pll {
        frq: frq_for(vco / PLL_MULTIPLIER, clk_hz)?,
        divider,
    })
}

/// NCO frequency word for an overflow rate of `hz`
fn frq_for(hz: u64, clk_hz: u32) -> Result<u32> {
    let frq = (hz << 32) / u64::from(clk_hz);
    // The NCO cannot run faster than half the system clock
    if frq > u64::from(u32::MAX / 2) + 1 {
        return Err(Error::InvalidArgument);
    }
    Ok(frq as u32)
}

/// Square-wave settings for one clock rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SquareWave {
    clk_hz: u32,
    period_ticks: u32,
}

impl SquareWave {
    pub fn new(config: &SquareWaveConfig, ticks_per_second: u32) -> Result<Self> {
        config.validate()?;
        let per_us = (ticks_per_second / 1_000_000).max(1);
        let period_ticks = config
            .update_period_us
            .checked_mul(per_us)
            .filter(|ticks| *ticks <= u32::MAX / 2)
            .ok_or(Error::InvalidArgument)?;
        Ok(Self {
            clk_hz: ticks_per_second,
            period_ticks,
        })
    }
}

impl Waveform for SquareWave {
    const KIND: WorkerKind = WorkerKind::SquareWave;

    fn period_ticks(&self) -> u32 {
        self.period_ticks
    }

    fn validate(&self, hz: u32) -> Result<()> {
        counter_mode_for(hz, self.clk_hz).map(|_| ())
    }

    fn counter_mode(&self, hz: u32) -> CounterMode {
        counter_mode_for(hz, self.clk_hz).unwrap_or(CounterMode::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CLK: u32 = 80_000_000;

    #[test]
    fn test_low_frequency_uses_nco() {
        // 1 kHz at 80 MHz: 2^32 / 80_000
        assert_eq!(
            counter_mode_for(1_000, CLK),
            Ok(CounterMode::Nco { frq: 53_687 })
        );
        assert!(matches!(
            counter_mode_for(499_999, CLK),
            Ok(CounterMode::Nco { .. })
        ));
    }

    #[test]
    fn test_threshold_switches_to_pll() {
        // 500 kHz * 128 = 64 MHz VCO, divider 0, NCO at 4 MHz
        assert_eq!(
            counter_mode_for(500_000, CLK),
            Ok(CounterMode::Pll {
                frq: 0x0CCC_CCCC,
                divider: 0
            })
        );
    }

    #[test]
    fn test_top_frequency() {
        assert_eq!(
            counter_mode_for(128_000_000, CLK),
            Ok(CounterMode::Pll {
                frq: 0x1999_9999,
                divider: 7
            })
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(counter_mode_for(0, CLK), Err(Error::InvalidArgument));
        assert_eq!(
            counter_mode_for(128_000_001, CLK),
            Err(Error::InvalidArgument)
        );
    }

    #[test]
    fn test_waveform_validates_through_mode() {
        let wave = SquareWave::new(&SquareWaveConfig::default(), CLK).unwrap();
        assert_eq!(wave.validate(440), Ok(()));
        assert_eq!(wave.validate(0), Err(Error::InvalidArgument));
        assert_eq!(wave.period_ticks(), 80_000);
    }

    proptest! {
        #[test]
        fn prop_pll_vco_in_range(hz in PLL_THRESHOLD_HZ..=MAX_FREQUENCY_HZ) {
            match counter_mode_for(hz, CLK).unwrap() {
                CounterMode::Pll { divider, .. } => {
                    let vco = u64::from(hz) << (7 - divider);
                    prop_assert!((VCO_MIN_HZ..=VCO_MAX_HZ).contains(&vco));
                }
                other => prop_assert!(false, "unexpected mode {:?}", other),
            }
        }

        #[test]
        fn prop_nco_rate_close_to_target(hz in 1u32..PLL_THRESHOLD_HZ) {
            let CounterMode::Nco { frq } = counter_mode_for(hz, CLK).unwrap() else {
                return Err(TestCaseError::fail("expected NCO"));
            };
            // Output rate recovered from the word is within one LSB step
            let actual = (u64::from(frq) * u64::from(CLK)) >> 32;
            prop_assert!(u64::from(hz) - actual <= 1);
        }
    }
}
