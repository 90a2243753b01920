//! Error types for encoder construction and reconfiguration.
//!
//! Runtime decode problems (bounce, duplicate edges, watchdog timeouts) are
//! not errors: the decoder drops them silently. Only setup and
//! reconfiguration can fail.

use qdec_common::gpio::{ChannelId, GpioError};
use thiserror::Error;

/// Errors returned by the encoder facade, the bank and the backend registry.
#[derive(Debug, Clone, Error)]
pub enum EncoderError {
    /// Invalid or duplicate channel identifiers, or a backend rejected a line.
    #[error("Encoder configuration error: {0}")]
    Configuration(String),

    /// Edge source unreachable or a line is already claimed.
    #[error("GPIO backend unavailable: {0}")]
    BackendUnavailable(#[source] GpioError),

    /// Any other backend failure during setup or reconfiguration.
    #[error("GPIO operation failed: {0}")]
    Gpio(#[source] GpioError),

    /// Requested backend is not registered.
    #[error("GPIO backend not found: {0}")]
    BackendNotFound(String),

    /// Operation on an encoder that has been cancelled.
    #[error("Encoder '{0}' has been cancelled")]
    Cancelled(String),

    /// Notification worker could not be started.
    #[error("Notifier setup failed: {0}")]
    Notifier(String),
}

impl EncoderError {
    /// Duplicate channel pair.
    pub(crate) fn same_channel(channel: ChannelId) -> Self {
        EncoderError::Configuration(format!(
            "channel A and channel B must differ (both {channel})"
        ))
    }
}

impl From<GpioError> for EncoderError {
    fn from(err: GpioError) -> Self {
        match err {
            GpioError::InvalidChannel(channel) => {
                EncoderError::Configuration(format!("invalid GPIO channel {channel}"))
            }
            GpioError::ChannelBusy(_) | GpioError::Unavailable(_) => {
                EncoderError::BackendUnavailable(err)
            }
            other => EncoderError::Gpio(other),
        }
    }
}
