//! Encoder facade.
//!
//! An [`Encoder`] owns two GPIO lines of a backend, the decoder state fed by
//! their edges and a shared [`Notifier`]. Construction claims and configures
//! the lines and subscribes to both edges on each; dropping the encoder (or
//! calling [`Encoder::cancel`]) stops delivery and hands the lines back.
//!
//! # Locking
//!
//! | Lock | Protects | Taken by |
//! |------|----------|----------|
//! | decoder lock | levels, prior state, steps, liveness | edge handler, get/set, cancel |
//! | line lock | subscriptions, noise filter | cancel, `set_noise_filter` |
//!
//! The notifier runs inside the edge handler with the decoder lock held, so
//! it must not call back into the same encoder.

use crate::decoder::{Channel, DecoderState, EdgeOutcome};
use crate::error::EncoderError;
use crate::notifier::Notifier;
use parking_lot::Mutex;
use qdec_common::config::{DecoderConfig, EncoderConfig, Mode};
use qdec_common::consts::{DEFAULT_NOISE_FILTER_US, MAX_CHANNEL};
use qdec_common::gpio::{
    ChannelId, EdgeEvent, EdgeHandler, EdgeTrigger, GpioBackend, Pull, SubscriptionId,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Construction parameters of one encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Name used in logs.
    pub name: String,
    /// Line of channel A.
    pub channel_a: ChannelId,
    /// Line of channel B.
    pub channel_b: ChannelId,
    /// Reporting mode.
    pub mode: Mode,
    /// Glitch filter window applied to both lines.
    pub noise_filter: Duration,
}

impl EncoderOptions {
    /// Options for an encoder on `channel_a`/`channel_b` with the default
    /// noise filter.
    pub fn new(channel_a: ChannelId, channel_b: ChannelId, mode: Mode) -> Self {
        Self {
            name: format!("encoder@{channel_a}/{channel_b}"),
            channel_a,
            channel_b,
            mode,
            noise_filter: Duration::from_micros(u64::from(DEFAULT_NOISE_FILTER_US)),
        }
    }

    /// Options for a configured encoder entry.
    pub fn from_config(encoder: &EncoderConfig, decoder: &DecoderConfig) -> Self {
        Self::new(encoder.channel_a, encoder.channel_b, decoder.mode)
            .named(encoder.name.clone())
            .with_noise_filter(decoder.noise_filter())
    }

    /// Set the log name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the glitch filter window.
    pub fn with_noise_filter(mut self, window: Duration) -> Self {
        self.noise_filter = window;
        self
    }

    fn validate(&self) -> Result<(), EncoderError> {
        if self.channel_a == self.channel_b {
            return Err(EncoderError::same_channel(self.channel_a));
        }
        for channel in [self.channel_a, self.channel_b] {
            if channel > MAX_CHANNEL {
                return Err(EncoderError::Configuration(format!(
                    "channel {channel} out of range (max {MAX_CHANNEL})"
                )));
            }
        }
        Ok(())
    }
}

struct DecoderSlot {
    decoder: DecoderState,
    live: bool,
}

/// State reachable from the edge handlers.
struct Shared {
    name: String,
    state: Mutex<DecoderSlot>,
    notifier: Arc<dyn Notifier>,
}

impl Shared {
    fn on_event(&self, channel: Channel, event: EdgeEvent) {
        // Watchdog timeouts carry no level.
        let Some(level) = event.level.level() else {
            return;
        };

        let mut slot = self.state.lock();
        if !slot.live {
            return;
        }
        let outcome = slot.decoder.on_edge(channel, level);
        if outcome == EdgeOutcome::Rejected {
            return;
        }
        trace!(
            encoder = %self.name,
            ?channel,
            steps = slot.decoder.steps(),
            "Quarter-step accepted"
        );
        if let Some(position) = outcome.notification() {
            self.notifier.notify(position);
        }
    }
}

fn edge_handler(shared: &Arc<Shared>, channel: Channel) -> EdgeHandler {
    let shared = Arc::clone(shared);
    Arc::new(move |event: EdgeEvent| shared.on_event(channel, event))
}

struct LineSlot {
    /// `None` once the encoder has been cancelled.
    subscriptions: Option<Vec<SubscriptionId>>,
    noise_filter: Duration,
}

/// Undoes partial setup if `Encoder::create` fails half way.
struct Rollback<'a> {
    backend: &'a dyn GpioBackend,
    claimed: Vec<ChannelId>,
    subscriptions: Vec<SubscriptionId>,
}

impl Rollback<'_> {
    fn commit(mut self) -> Vec<SubscriptionId> {
        self.claimed.clear();
        std::mem::take(&mut self.subscriptions)
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            if let Err(e) = self.backend.unsubscribe(id) {
                warn!("Rollback: failed to unsubscribe {}: {}", id, e);
            }
        }
        for channel in self.claimed.drain(..) {
            if let Err(e) = self.backend.set_debounce(channel, Duration::ZERO) {
                debug!("Rollback: failed to clear filter on GPIO {}: {}", channel, e);
            }
            self.backend.release(channel);
        }
    }
}

/// One quadrature encoder bound to two GPIO lines.
pub struct Encoder {
    name: String,
    channel_a: ChannelId,
    channel_b: ChannelId,
    mode: Mode,
    backend: Arc<dyn GpioBackend>,
    shared: Arc<Shared>,
    lines: Mutex<LineSlot>,
}

impl Encoder {
    /// Claim both lines and start decoding.
    ///
    /// Both lines become pulled-up inputs with the configured glitch filter.
    /// Their current levels seed the decoder without producing a
    /// notification.
    ///
    /// # Errors
    /// - `Configuration` for equal or out-of-range channels
    /// - `BackendUnavailable` if the backend is unreachable or a line is taken
    /// - `Gpio` for any other backend failure
    ///
    /// Lines and subscriptions acquired before the failure are released.
    pub fn create(
        backend: Arc<dyn GpioBackend>,
        options: &EncoderOptions,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, EncoderError> {
        options.validate()?;
        let (a, b) = (options.channel_a, options.channel_b);

        let mut rollback = Rollback {
            backend: &*backend,
            claimed: Vec::with_capacity(2),
            subscriptions: Vec::with_capacity(2),
        };

        for channel in [a, b] {
            backend.configure_input(channel)?;
            rollback.claimed.push(channel);
            backend.set_pull(channel, Pull::Up)?;
            backend.set_debounce(channel, options.noise_filter)?;
        }

        let level_a = backend.read_level(a)?;
        let level_b = backend.read_level(b)?;
        let shared = Arc::new(Shared {
            name: options.name.clone(),
            state: Mutex::new(DecoderSlot {
                decoder: DecoderState::new(options.mode, level_a, level_b),
                live: true,
            }),
            notifier,
        });

        for (channel, tag) in [(a, Channel::A), (b, Channel::B)] {
            let handler = edge_handler(&shared, tag);
            let id = backend.subscribe_edge(channel, EdgeTrigger::Both, handler)?;
            rollback.subscriptions.push(id);
        }
        let subscriptions = rollback.commit();

        info!(
            "Encoder '{}' started on GPIO {}/{} ({:?}, filter {:?}, backend {})",
            options.name,
            a,
            b,
            options.mode,
            options.noise_filter,
            backend.name()
        );

        Ok(Self {
            name: options.name.clone(),
            channel_a: a,
            channel_b: b,
            mode: options.mode,
            backend,
            shared,
            lines: Mutex::new(LineSlot {
                subscriptions: Some(subscriptions),
                noise_filter: options.noise_filter,
            }),
        })
    }

    /// Stop decoding and release both lines.
    ///
    /// Idempotent. Once it returns no edge handler is running for this
    /// encoder and none will run again. The glitch filter is reset to zero
    /// before the lines are released.
    pub fn cancel(&self) {
        let mut lines = self.lines.lock();
        let Some(subscriptions) = lines.subscriptions.take() else {
            return;
        };

        for id in subscriptions {
            if let Err(e) = self.backend.unsubscribe(id) {
                warn!("Encoder '{}': failed to unsubscribe {}: {}", self.name, id, e);
            }
        }
        self.shared.state.lock().live = false;

        for channel in [self.channel_a, self.channel_b] {
            if let Err(e) = self.backend.set_debounce(channel, Duration::ZERO) {
                debug!(
                    "Encoder '{}': failed to clear filter on GPIO {}: {}",
                    self.name, channel, e
                );
            }
            self.backend.release(channel);
        }
        lines.noise_filter = Duration::ZERO;

        info!(
            "Encoder '{}' cancelled at position {}",
            self.name,
            self.get_position()
        );
    }

    /// Reported position: quarter-steps in raw mode, detents in detent mode.
    pub fn get_position(&self) -> i64 {
        self.shared.state.lock().decoder.position()
    }

    /// Force the reported position. No notification is sent.
    pub fn set_position(&self, position: i64) {
        self.shared.state.lock().decoder.set_position(position);
        debug!("Encoder '{}' position set to {}", self.name, position);
    }

    /// Quarter-step counter.
    pub fn steps(&self) -> i64 {
        self.shared.state.lock().decoder.steps()
    }

    /// Change the glitch filter window on both lines.
    ///
    /// Returns `Ok(false)` without touching the backend when `window` equals
    /// the current setting.
    ///
    /// # Errors
    /// `Cancelled` after [`cancel`](Self::cancel); a backend error otherwise,
    /// in which case the stored window is unchanged.
    pub fn set_noise_filter(&self, window: Duration) -> Result<bool, EncoderError> {
        let mut lines = self.lines.lock();
        if lines.subscriptions.is_none() {
            return Err(EncoderError::Cancelled(self.name.clone()));
        }
        if lines.noise_filter == window {
            return Ok(false);
        }

        for channel in [self.channel_a, self.channel_b] {
            self.backend.set_debounce(channel, window)?;
        }
        debug!(
            "Encoder '{}' noise filter {:?} -> {:?}",
            self.name, lines.noise_filter, window
        );
        lines.noise_filter = window;
        Ok(true)
    }

    /// Current glitch filter window.
    pub fn noise_filter(&self) -> Duration {
        self.lines.lock().noise_filter
    }

    /// Whether edges are still being decoded.
    pub fn is_live(&self) -> bool {
        self.lines.lock().subscriptions.is_some()
    }

    /// Log name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lines of channel A and channel B.
    pub fn channels(&self) -> (ChannelId, ChannelId) {
        (self.channel_a, self.channel_b)
    }

    /// Reporting mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("name", &self.name)
            .field("channel_a", &self.channel_a)
            .field("channel_b", &self.channel_b)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
