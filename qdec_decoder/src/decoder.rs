//! Decoder engine.
//!
//! `DecoderState` holds the latched channel levels, the last accepted
//! combined state and the quarter-step counter of one encoder. It is plain
//! data; the [`Encoder`](crate::encoder::Encoder) facade wraps it in a lock and
//! feeds it from the GPIO delivery context.

use crate::transitions::{QuadState, lookup};
use qdec_common::config::Mode;
use qdec_common::gpio::Level;

/// Which of the two encoder channels an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Channel A (high bit of the combined state).
    A,
    /// Channel B (low bit of the combined state).
    B,
}

/// Result of feeding one edge to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Not a legal quarter-step; state untouched.
    Rejected,
    /// Step counted, reported position unchanged (detent mode between clicks).
    Stepped,
    /// Step counted and the reported position changed to this value.
    Moved(i64),
}

impl EdgeOutcome {
    /// Position to notify, if any.
    #[inline]
    pub fn notification(self) -> Option<i64> {
        match self {
            EdgeOutcome::Moved(position) => Some(position),
            _ => None,
        }
    }
}

/// Per-encoder decoding state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderState {
    mode: Mode,
    level_a: Level,
    level_b: Level,
    prior: QuadState,
    steps: i64,
}

impl DecoderState {
    /// Seed the state from the levels read at construction.
    ///
    /// The seed read is not a transition and never counts.
    pub fn new(mode: Mode, level_a: Level, level_b: Level) -> Self {
        Self {
            mode,
            level_a,
            level_b,
            prior: QuadState::from_bits(level_a.bit(), level_b.bit()),
            steps: 0,
        }
    }

    /// Feed one binary edge.
    ///
    /// Timeout sentinels must be filtered out before this point.
    pub fn on_edge(&mut self, channel: Channel, level: Level) -> EdgeOutcome {
        match channel {
            Channel::A => self.level_a = level,
            Channel::B => self.level_b = level,
        }

        let next = QuadState::from_bits(self.level_a.bit(), self.level_b.bit());
        let inc = lookup(self.prior, next);
        if inc == 0 {
            return EdgeOutcome::Rejected;
        }

        self.prior = next;
        let before = self.position();
        self.steps = self.steps.saturating_add(i64::from(inc));

        match self.mode {
            Mode::Raw => EdgeOutcome::Moved(self.steps),
            Mode::Detent => {
                let after = self.position();
                if after != before {
                    EdgeOutcome::Moved(after)
                } else {
                    EdgeOutcome::Stepped
                }
            }
        }
    }

    /// Reported position: steps in raw mode, whole detents in detent mode.
    #[inline]
    pub fn position(&self) -> i64 {
        self.mode.position_of(self.steps)
    }

    /// Force the reported position. Channel state is left alone so the next
    /// edge decodes relative to the current hardware levels.
    pub fn set_position(&mut self, position: i64) {
        self.steps = self.mode.steps_for(position);
    }

    /// Quarter-step counter.
    #[inline]
    pub fn steps(&self) -> i64 {
        self.steps
    }

    /// Reporting mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Last accepted combined state.
    #[inline]
    pub fn prior_state(&self) -> QuadState {
        self.prior
    }

    /// Latched levels of channel A and channel B.
    #[inline]
    pub fn levels(&self) -> (Level, Level) {
        (self.level_a, self.level_b)
    }
}
