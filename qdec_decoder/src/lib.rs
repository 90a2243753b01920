//! # qdec decoder library
//!
//! Quadrature rotary encoder decoding over a pluggable GPIO edge source.
//!
//! Each [`Encoder`] owns two lines of a [`GpioBackend`](qdec_common::gpio::GpioBackend),
//! turns their edges into a signed quarter-step count through a fixed
//! transition table and reports position changes to a [`Notifier`].
//!
//! # Module Structure
//!
//! - [`transitions`] - 16-entry transition table
//! - [`decoder`] - per-encoder decoding state and detent policy
//! - [`encoder`] - encoder facade (create, cancel, position, noise filter)
//! - [`bank`] - the configured set of encoders
//! - [`notifier`] - notification sinks and delivery policies
//! - [`backend_registry`] - backend factory registration
//! - [`backends`] - GPIO backend implementations
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        qdec_decoder                            │
//! │  ┌──────────────┐  edge   ┌──────────────┐  position ┌───────┐ │
//! │  │ GpioBackend  │────────►│   Encoder    │──────────►│Notifier│ │
//! │  │ (trait obj)  │         │ DecoderState │           └───────┘ │
//! │  └──────▲───────┘         └──────────────┘                     │
//! │         │ create(name)                                         │
//! │  ┌──────┴───────────┐                                          │
//! │  │ BackendRegistry  │                                          │
//! │  └──────────────────┘                                          │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod backend_registry;
pub mod backends;
pub mod bank;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod notifier;
pub mod transitions;

// Re-export key types for convenience
pub use crate::backend_registry::BackendRegistry;
pub use crate::bank::EncoderBank;
pub use crate::decoder::{Channel, DecoderState, EdgeOutcome};
pub use crate::encoder::{Encoder, EncoderOptions};
pub use crate::error::EncoderError;
pub use crate::notifier::{Fanout, LogNotifier, Notifier, QueuedNotifier, TopicNotifier};
pub use qdec_common::config::{Mode, NotifyPolicy};
