//! Position notifiers.
//!
//! A [`Notifier`] receives every reportable position change of one encoder.
//! It is called from the edge delivery context while the encoder lock is
//! held, so it must return quickly. Sinks that may block (files, sockets,
//! stdout) belong behind a [`QueuedNotifier`].
//!
//! - [`Fanout`] - deliver to several notifiers in order
//! - [`LogNotifier`] - structured `tracing` event per position
//! - [`TopicNotifier`] - JSON line per position on a writer, one topic per encoder
//! - [`QueuedNotifier`] - bounded hand-off to a worker thread (deferred policy)
//! - [`telemetry`] - log event plus JSON line, always queued

use parking_lot::Mutex;
use qdec_common::config::{NotifyConfig, NotifyPolicy};
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::EncoderError;

/// Sink for position changes.
pub trait Notifier: Send + Sync {
    /// Called once per reportable position change, in decode order.
    fn notify(&self, position: i64);
}

impl<F> Notifier for F
where
    F: Fn(i64) + Send + Sync,
{
    fn notify(&self, position: i64) {
        self(position)
    }
}

/// Delivers each position to every child, in insertion order.
#[derive(Default, Clone)]
pub struct Fanout {
    targets: Vec<Arc<dyn Notifier>>,
}

impl Fanout {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target.
    pub fn with(mut self, target: Arc<dyn Notifier>) -> Self {
        self.targets.push(target);
        self
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when there are no targets.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Notifier for Fanout {
    fn notify(&self, position: i64) {
        for target in &self.targets {
            target.notify(position);
        }
    }
}

/// Emits an `info` event per position change.
pub struct LogNotifier {
    encoder: String,
}

impl LogNotifier {
    /// Log positions of the named encoder.
    pub fn new(encoder: impl Into<String>) -> Self {
        Self {
            encoder: encoder.into(),
        }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, position: i64) {
        info!(encoder = %self.encoder, position, "Position changed");
    }
}

/// Telemetry record written by [`TopicNotifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionUpdate<'a> {
    /// Topic the value is published on.
    pub topic: &'a str,
    /// Reported position.
    pub position: i64,
    /// Per-topic sequence number, starting at 0.
    pub sequence: u64,
}

/// Publishes each position as one JSON line on a writer.
///
/// Best effort: write failures are logged and the value is lost.
pub struct TopicNotifier<W: Write + Send> {
    topic: String,
    sink: Mutex<W>,
    sequence: AtomicU64,
}

impl<W: Write + Send> TopicNotifier<W> {
    /// Publish on `topic` into `sink`.
    pub fn new(topic: impl Into<String>, sink: W) -> Self {
        Self {
            topic: topic.into(),
            sink: Mutex::new(sink),
            sequence: AtomicU64::new(0),
        }
    }

    /// Topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Consume the notifier and return the sink.
    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }
}

impl<W: Write + Send> Notifier for TopicNotifier<W> {
    fn notify(&self, position: i64) {
        let update = PositionUpdate {
            topic: &self.topic,
            position,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };

        let mut sink = self.sink.lock();
        if let Err(e) = write_line(&mut *sink, &update) {
            warn!(topic = %self.topic, "Failed to publish position {}: {}", position, e);
        }
    }
}

fn write_line<W: Write>(sink: &mut W, update: &PositionUpdate<'_>) -> std::io::Result<()> {
    serde_json::to_writer(&mut *sink, update)?;
    sink.write_all(b"\n")?;
    sink.flush()
}

/// Hands positions to a worker thread through a bounded queue.
///
/// `notify` never blocks: when the queue is full the value is dropped and
/// counted. Dropping the notifier drains the queue and joins the worker.
pub struct QueuedNotifier {
    sender: Option<SyncSender<i64>>,
    worker: Option<JoinHandle<()>>,
    dropped: AtomicU64,
    name: String,
}

impl QueuedNotifier {
    /// Start a worker delivering to `inner`.
    ///
    /// # Errors
    /// Returns `EncoderError::Notifier` if `capacity` is zero or the worker
    /// thread cannot be spawned.
    pub fn spawn(
        name: impl Into<String>,
        inner: Arc<dyn Notifier>,
        capacity: usize,
    ) -> Result<Self, EncoderError> {
        let name = name.into();
        if capacity == 0 {
            return Err(EncoderError::Notifier(
                "queue capacity must be greater than 0".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::sync_channel::<i64>(capacity);
        let worker = std::thread::Builder::new()
            .name(format!("qdec-notify-{name}"))
            .spawn(move || {
                for position in receiver {
                    inner.notify(position);
                }
            })
            .map_err(|e| EncoderError::Notifier(e.to_string()))?;

        debug!("Notification worker for '{}' started (capacity {})", name, capacity);

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            dropped: AtomicU64::new(0),
            name,
        })
    }

    /// Number of positions dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Notifier for QueuedNotifier {
    fn notify(&self, position: i64) {
        let Some(sender) = &self.sender else {
            return;
        };
        match sender.try_send(position) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    notifier = %self.name,
                    dropped = total,
                    "Notification queue full, position {} dropped",
                    position
                );
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl Drop for QueuedNotifier {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the queue is drained.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(notifier = %self.name, "Notification worker panicked");
            }
        }
    }
}

/// Wrap `inner` according to the configured delivery policy.
///
/// The inline policy is only safe for notifiers that never block; use
/// [`telemetry`] or a [`QueuedNotifier`] for anything that does I/O.
pub fn with_policy(
    name: &str,
    inner: Arc<dyn Notifier>,
    config: &NotifyConfig,
) -> Result<Arc<dyn Notifier>, EncoderError> {
    match config.policy {
        NotifyPolicy::Inline => Ok(inner),
        NotifyPolicy::Deferred => Ok(Arc::new(QueuedNotifier::spawn(
            name,
            inner,
            config.queue_capacity,
        )?)),
    }
}

/// Log event plus one JSON line on `sink` per position of one encoder.
///
/// Both sinks may block, so they always run on a worker thread fed by a
/// queue of `config.queue_capacity`, whatever `config.policy` says.
pub fn telemetry<W>(
    name: &str,
    topic: &str,
    sink: W,
    config: &NotifyConfig,
) -> Result<Arc<dyn Notifier>, EncoderError>
where
    W: Write + Send + 'static,
{
    if config.policy == NotifyPolicy::Inline {
        debug!("Telemetry for '{}' is queued despite the inline policy", name);
    }
    let fanout = Fanout::new()
        .with(Arc::new(LogNotifier::new(name)))
        .with(Arc::new(TopicNotifier::new(topic, sink)));
    Ok(Arc::new(QueuedNotifier::spawn(
        name,
        Arc::new(fanout),
        config.queue_capacity,
    )?))
}
