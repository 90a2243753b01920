//! Quadrature transition table.
//!
//! The combined state of an encoder is `(A << 1) | B`. Legal rotation walks
//! the Gray sequence below; each step between neighbours is one quarter-step.
//!
//! ```text
//!             +---------+         +---------+      1
//!             |         |         |         |
//!   A         |         |         |         |
//!             |         |         |         |
//!   +---------+         +---------+         +----- 0
//!
//!        +---------+         +---------+            1
//!        |         |         |         |
//!   B    |         |         |         |
//!        |         |         |         |
//!   -----+         +---------+         +---------+  0
//!
//!   forward:  00 -> 01 -> 11 -> 10 -> 00
//! ```
//!
//! Any pair that is not a neighbour step (a repeated state, or a diagonal jump
//! where both channels changed) maps to 0 and is ignored as bounce.

use static_assertions::const_assert;

/// Two-bit combined channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QuadState(u8);

impl QuadState {
    /// Build a state from raw bits; only the low two bits are kept.
    #[inline]
    pub const fn new(bits: u8) -> Self {
        Self(bits & 0b11)
    }

    /// Build a state from the levels of channel A and channel B.
    #[inline]
    pub const fn from_bits(a: u8, b: u8) -> Self {
        Self::new(((a & 1) << 1) | (b & 1))
    }

    /// The two-bit value.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Increment for every `(prior << 2) | next` index.
pub const TRANSITIONS: [i8; 16] = [
    /* 0000 0001 0010 0011 0100 0101 0110 0111 */
    0, 1, -1, 0, -1, 0, 0, 1,
    /* 1000 1001 1010 1011 1100 1101 1110 1111 */
    1, 0, 0, -1, 0, -1, 1, 0,
];

/// Increment for moving from `prior` to `next`: +1 forward, -1 reverse,
/// 0 for anything that is not a single legal quarter-step.
#[inline]
pub const fn lookup(prior: QuadState, next: QuadState) -> i8 {
    TRANSITIONS[((prior.bits() << 2) | next.bits()) as usize]
}

/// Every step reversed must count the opposite way, and no state may step to
/// itself.
const fn is_reversible(table: &[i8; 16]) -> bool {
    let mut prior = 0;
    while prior < 4 {
        let mut next = 0;
        while next < 4 {
            let forward = table[(prior << 2) | next];
            let backward = table[(next << 2) | prior];
            if forward != -backward {
                return false;
            }
            if prior == next && forward != 0 {
                return false;
            }
            next += 1;
        }
        prior += 1;
    }
    true
}

const_assert!(is_reversible(&TRANSITIONS));
