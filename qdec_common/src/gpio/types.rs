//! GPIO value types shared between backends and the decoder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Logical identifier of a GPIO line (BCM numbering on a Raspberry Pi).
pub type ChannelId = u32;

/// Binary logic level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Line reads 0.
    Low,
    /// Line reads 1.
    High,
}

impl Level {
    /// Level as a single bit (0 or 1).
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }

    /// Opposite level.
    #[inline]
    pub const fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bit())
    }
}

/// Level reported with an edge event.
///
/// Edge sources with a watchdog emit [`EdgeLevel::Timeout`] when no edge was
/// seen within the watchdog period. It carries no level information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeLevel {
    /// Line changed to low.
    Low,
    /// Line changed to high.
    High,
    /// Watchdog timeout, no edge.
    Timeout,
}

impl EdgeLevel {
    /// Binary level, or `None` for the timeout sentinel.
    #[inline]
    pub const fn level(self) -> Option<Level> {
        match self {
            EdgeLevel::Low => Some(Level::Low),
            EdgeLevel::High => Some(Level::High),
            EdgeLevel::Timeout => None,
        }
    }
}

impl From<Level> for EdgeLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => EdgeLevel::Low,
            Level::High => EdgeLevel::High,
        }
    }
}

/// One edge notification delivered by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Line the edge occurred on.
    pub channel: ChannelId,
    /// New level, or the timeout sentinel.
    pub level: EdgeLevel,
    /// Monotonic timestamp of the edge, relative to the backend's epoch.
    pub timestamp: Duration,
}

/// Pull resistor bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pull {
    /// No bias; line floats.
    #[default]
    Off,
    /// Pull-down to ground.
    Down,
    /// Pull-up to supply. Encoders with a grounded common idle high.
    Up,
}

/// Edges a subscription wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeTrigger {
    /// Low → high only.
    Rising,
    /// High → low only.
    Falling,
    /// Both directions.
    Both,
}

impl EdgeTrigger {
    /// Whether a change to `level` should be delivered.
    pub const fn accepts(self, level: EdgeLevel) -> bool {
        match (self, level) {
            (_, EdgeLevel::Timeout) | (EdgeTrigger::Both, _) => true,
            (EdgeTrigger::Rising, EdgeLevel::High) => true,
            (EdgeTrigger::Falling, EdgeLevel::Low) => true,
            _ => false,
        }
    }
}

/// Handle returned by a subscription, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Edge callback. Invoked from the backend's delivery context.
pub type EdgeHandler = Arc<dyn Fn(EdgeEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bits() {
        assert_eq!(Level::Low.bit(), 0);
        assert_eq!(Level::High.bit(), 1);
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::High.toggled(), Level::Low);
    }

    #[test]
    fn timeout_has_no_level() {
        assert_eq!(EdgeLevel::Timeout.level(), None);
        assert_eq!(EdgeLevel::High.level(), Some(Level::High));
        assert_eq!(EdgeLevel::from(Level::Low), EdgeLevel::Low);
    }

    #[test]
    fn trigger_filtering() {
        assert!(EdgeTrigger::Both.accepts(EdgeLevel::Low));
        assert!(EdgeTrigger::Rising.accepts(EdgeLevel::High));
        assert!(!EdgeTrigger::Rising.accepts(EdgeLevel::Low));
        assert!(!EdgeTrigger::Falling.accepts(EdgeLevel::High));
        assert!(EdgeTrigger::Falling.accepts(EdgeLevel::Timeout));
    }
}
