//! Simulated GPIO line state and the quadrature stepping helper.

use qdec_common::gpio::{Level, Pull};
use std::time::Duration;

/// Forward Gray sequence of `(A << 1) | B`.
const FORWARD: [u8; 4] = [0b00, 0b01, 0b11, 0b10];

/// State of one simulated line.
#[derive(Debug, Clone, Default)]
pub(super) struct Line {
    /// Claimed by `configure_input`.
    pub claimed: bool,
    /// Pull bias.
    pub pull: Pull,
    /// Level forced by the test harness; `None` floats to the pull bias.
    pub driven: Option<Level>,
    /// Glitch filter window.
    pub debounce: Duration,
    /// Number of `set_debounce` calls.
    pub debounce_calls: u32,
}

impl Line {
    /// Level a read would return.
    pub fn level(&self) -> Level {
        self.driven.unwrap_or(match self.pull {
            Pull::Up => Level::High,
            Pull::Down | Pull::Off => Level::Low,
        })
    }
}

/// Next `(A, B)` levels one quarter-step away from `(a, b)`.
///
/// `forward` walks 00 → 01 → 11 → 10 → 00; otherwise the reverse.
pub fn quadrature_step(a: Level, b: Level, forward: bool) -> (Level, Level) {
    let bits = (a.bit() << 1) | b.bit();
    let idx = FORWARD.iter().position(|&s| s == bits).unwrap_or(0);
    let next = if forward {
        FORWARD[(idx + 1) % 4]
    } else {
        FORWARD[(idx + 3) % 4]
    };
    (Level::from(next & 0b10 != 0), Level::from(next & 0b01 != 0))
}
