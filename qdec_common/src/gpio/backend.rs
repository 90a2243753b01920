//! GPIO backend trait and error types.
//!
//! This module defines:
//! - `GpioBackend` trait - Interface for pluggable edge sources
//! - `GpioError` enum - Error types for GPIO operations
//! - `BackendFactory` type alias - Factory function type

use super::types::{ChannelId, EdgeHandler, EdgeTrigger, Level, Pull, SubscriptionId};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error types for GPIO operations.
#[derive(Debug, Clone, Error)]
pub enum GpioError {
    /// Line identifier not known to the backend
    #[error("Invalid GPIO channel: {0}")]
    InvalidChannel(ChannelId),

    /// Line already claimed by another owner
    #[error("GPIO channel {0} is already claimed")]
    ChannelBusy(ChannelId),

    /// Backend cannot be reached (daemon down, no /dev/gpiomem, ...)
    #[error("GPIO backend unavailable: {0}")]
    Unavailable(String),

    /// Subscription handle not known to the backend
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),

    /// Any other hardware or OS failure
    #[error("GPIO I/O error: {0}")]
    Io(String),
}

/// Factory function type for creating backend instances.
pub type BackendFactory = fn() -> Result<Arc<dyn GpioBackend>, GpioError>;

/// Trait defining the interface of a GPIO edge source.
///
/// Backends are shared between encoders, so every method takes `&self` and
/// implementations use interior locking.
///
/// # Delivery Contract
///
/// | Operation | Guarantee |
/// |-----------|-----------|
/// | `subscribe_edge()` | Handler is invoked once per edge, in arrival order per line |
/// | `unsubscribe()` | On return, no invocation of the handler is running and none will start |
/// | handler | May run on several threads at once, including for one subscription |
/// | handler | Must not call back into the backend |
pub trait GpioBackend: Send + Sync {
    /// Returns the backend's unique identifier (e.g., "simulation", "rppal").
    fn name(&self) -> &'static str;

    /// Claim `channel` and configure it as an input.
    ///
    /// # Errors
    /// `InvalidChannel` for unknown lines, `ChannelBusy` if already claimed.
    fn configure_input(&self, channel: ChannelId) -> Result<(), GpioError>;

    /// Set the pull resistor bias of a claimed input.
    fn set_pull(&self, channel: ChannelId, pull: Pull) -> Result<(), GpioError>;

    /// Set the glitch filter window. `Duration::ZERO` disables filtering.
    fn set_debounce(&self, channel: ChannelId, window: Duration) -> Result<(), GpioError>;

    /// Read the current level of a line.
    fn read_level(&self, channel: ChannelId) -> Result<Level, GpioError>;

    /// Register `handler` for edges on `channel`.
    fn subscribe_edge(
        &self,
        channel: ChannelId,
        trigger: EdgeTrigger,
        handler: EdgeHandler,
    ) -> Result<SubscriptionId, GpioError>;

    /// Cancel a subscription. See the delivery contract above.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), GpioError>;

    /// Release a claimed line.
    ///
    /// Default implementation does nothing (for backends without claims).
    fn release(&self, _channel: ChannelId) {
        // Default: no-op
    }
}
