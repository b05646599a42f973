//! Helpers shared by the integration tests
#![allow(dead_code)]

use std::time::{Duration, Instant};

use cogline_drivers::sim::SimBoard;
use cogline_drivers::Cogline;
use cogline_hal::Line;

pub fn line(index: u8) -> Line {
    Line::new(index).unwrap()
}

/// Fresh runtime on its own simulated board
pub fn runtime() -> (SimBoard, Cogline<SimBoard>) {
    let board = SimBoard::new();
    let cog = Cogline::with_defaults(board.clone());
    (board, cog)
}

/// Poll `condition` until it holds or `limit` passes
pub fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
