//! Process-wide runtime on the simulated board

use lazy_static::lazy_static;

pub use cogline_hal_sim::{
    ClockSource, Device, PulseSource, RcDecay, ShiftEcho, SimBoard, SimClock, Wire,
};

use crate::runtime::Cogline;

lazy_static! {
    static ref GLOBAL: Cogline<SimBoard> = Cogline::with_defaults(SimBoard::new());
}

/// Shared runtime, created with the default configuration on first use
///
/// Code that needs its own board or configuration builds a [`Cogline`]
/// directly instead.
pub fn global() -> &'static Cogline<SimBoard> {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(global(), global()));
        assert!(global().simple().pwm_start(1_000).is_ok());
        global().simple().pwm_stop();
    }
}
