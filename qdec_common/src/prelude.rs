//! Prelude module for common re-exports.
//!
//! ```rust
//! use qdec_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, DecoderConfig, EncoderConfig, LogLevel, Mode, NotifyConfig,
    NotifyPolicy, QdecConfig, SharedConfig,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{MAX_CHANNEL, MAX_ENCODERS, STEPS_PER_DETENT};

// ─── GPIO ───────────────────────────────────────────────────────────
pub use crate::gpio::{
    ChannelId, EdgeEvent, EdgeHandler, EdgeLevel, EdgeTrigger, GpioBackend, GpioError, Level,
    Pull, SubscriptionId,
};
