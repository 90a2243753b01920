//! GPIO edge-source contract.
//!
//! The decoder never talks to hardware directly. It consumes a
//! [`GpioBackend`](backend::GpioBackend) that configures lines, reads levels
//! and delivers edge events to registered handlers.

pub mod backend;
pub mod types;

pub use backend::{BackendFactory, GpioBackend, GpioError};
pub use types::{
    ChannelId, EdgeEvent, EdgeHandler, EdgeLevel, EdgeTrigger, Level, Pull, SubscriptionId,
};
