//! Simulated GPIO edge source.
//!
//! `SimulatedGpio` implements the `GpioBackend` trait over in-memory lines.
//! The harness changes levels with [`SimulatedGpio::drive`] (edge only on a
//! real change), [`SimulatedGpio::inject`] (raw event, duplicates allowed)
//! or [`SimulatedGpio::rotate`] (quadrature steps). Handlers run on the
//! calling thread, so driving from several threads reproduces concurrent
//! interrupt delivery. Deliveries are not serialized: two threads may run
//! the same handler at once.
//!
//! Each subscription carries a gate. A delivery holds it shared while the
//! handler runs; `unsubscribe` takes it exclusively after removing the
//! subscription, which waits out deliveries already in flight.
//!
//! The glitch filter window is recorded but not applied.

use super::line::{Line, quadrature_step};
use parking_lot::{Mutex, RwLock};
use qdec_common::consts::MAX_CHANNEL;
use qdec_common::gpio::{
    ChannelId, EdgeEvent, EdgeHandler, EdgeLevel, EdgeTrigger, GpioBackend, GpioError, Level,
    Pull, SubscriptionId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

struct Subscription {
    channel: ChannelId,
    trigger: EdgeTrigger,
    handler: EdgeHandler,
    gate: Arc<RwLock<()>>,
}

#[derive(Default)]
struct SimState {
    lines: HashMap<ChannelId, Line>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    next_id: u64,
    offline: bool,
    external_claims: HashSet<ChannelId>,
    unsubscribe_calls: u32,
}

impl SimState {
    fn line_mut(&mut self, channel: ChannelId, max: ChannelId) -> Result<&mut Line, GpioError> {
        if self.offline {
            return Err(GpioError::Unavailable("simulated backend offline".to_string()));
        }
        if channel > max {
            return Err(GpioError::InvalidChannel(channel));
        }
        Ok(self.lines.entry(channel).or_default())
    }
}

/// In-memory GPIO backend.
pub struct SimulatedGpio {
    state: Mutex<SimState>,
    epoch: Instant,
    max_channel: ChannelId,
}

impl SimulatedGpio {
    /// Backend accepting lines `0..=MAX_CHANNEL`.
    pub fn new() -> Self {
        Self::with_max_channel(MAX_CHANNEL)
    }

    /// Backend accepting lines `0..=max_channel`.
    pub fn with_max_channel(max_channel: ChannelId) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            epoch: Instant::now(),
            max_channel,
        }
    }

    // ─── Harness controls ───────────────────────────────────────────

    /// Set `channel` to `level`, delivering an edge only if the level changed.
    ///
    /// Returns the number of handlers invoked.
    pub fn drive(&self, channel: ChannelId, level: Level) -> usize {
        if self.level(channel) == level {
            return 0;
        }
        self.inject(channel, level.into())
    }

    /// Deliver an edge event unconditionally (duplicates and timeouts allowed).
    ///
    /// A binary level also becomes the line's level. Returns the number of
    /// handlers invoked.
    pub fn inject(&self, channel: ChannelId, level: EdgeLevel) -> usize {
        let mut state = self.state.lock();
        if state.offline {
            return 0;
        }
        if let Some(level) = level.level() {
            state.lines.entry(channel).or_default().driven = Some(level);
        }
        let event = EdgeEvent {
            channel,
            level,
            timestamp: self.epoch.elapsed(),
        };
        let targets: Vec<(Arc<RwLock<()>>, EdgeHandler)> = state
            .subscriptions
            .values()
            .filter(|s| s.channel == channel && s.trigger.accepts(level))
            .map(|s| (Arc::clone(&s.gate), Arc::clone(&s.handler)))
            .collect();
        // Entered under the state lock, so an unsubscribe that has not yet
        // removed the subscription will wait for this delivery.
        let _entered: Vec<_> = targets.iter().map(|(gate, _)| gate.read()).collect();
        drop(state);

        trace!(channel, ?level, handlers = targets.len(), "Simulated edge");
        for (_, handler) in &targets {
            handler(event);
        }
        targets.len()
    }

    /// Deliver a watchdog timeout on `channel`.
    pub fn timeout(&self, channel: ChannelId) -> usize {
        self.inject(channel, EdgeLevel::Timeout)
    }

    /// Turn the encoder wired to `channel_a`/`channel_b` by `quarter_steps`
    /// (negative turns backwards), one legal edge per step.
    pub fn rotate(&self, channel_a: ChannelId, channel_b: ChannelId, quarter_steps: i64) {
        let forward = quarter_steps >= 0;
        for _ in 0..quarter_steps.unsigned_abs() {
            let (a, b) = (self.level(channel_a), self.level(channel_b));
            let (next_a, next_b) = quadrature_step(a, b, forward);
            if next_a != a {
                self.drive(channel_a, next_a);
            } else {
                self.drive(channel_b, next_b);
            }
        }
    }

    /// Make every backend call fail with `GpioError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Mark `channel` as owned by another process.
    pub fn claim_externally(&self, channel: ChannelId) {
        self.state.lock().external_claims.insert(channel);
    }

    // ─── Inspection ─────────────────────────────────────────────────

    /// Current level of a line (pull bias if never driven).
    pub fn level(&self, channel: ChannelId) -> Level {
        self.state
            .lock()
            .lines
            .get(&channel)
            .map(Line::level)
            .unwrap_or(Level::Low)
    }

    /// Pull bias of a line.
    pub fn pull(&self, channel: ChannelId) -> Pull {
        self.state
            .lock()
            .lines
            .get(&channel)
            .map(|l| l.pull)
            .unwrap_or_default()
    }

    /// Glitch filter window of a line.
    pub fn debounce(&self, channel: ChannelId) -> Duration {
        self.state
            .lock()
            .lines
            .get(&channel)
            .map(|l| l.debounce)
            .unwrap_or_default()
    }

    /// Number of `set_debounce` calls made for a line.
    pub fn debounce_calls(&self, channel: ChannelId) -> u32 {
        self.state
            .lock()
            .lines
            .get(&channel)
            .map(|l| l.debounce_calls)
            .unwrap_or(0)
    }

    /// Whether a line is currently claimed.
    pub fn is_claimed(&self, channel: ChannelId) -> bool {
        self.state
            .lock()
            .lines
            .get(&channel)
            .is_some_and(|l| l.claimed)
    }

    /// Number of live subscriptions on a line.
    pub fn subscriber_count(&self, channel: ChannelId) -> usize {
        self.state
            .lock()
            .subscriptions
            .values()
            .filter(|s| s.channel == channel)
            .count()
    }

    /// Number of successful `unsubscribe` calls.
    pub fn unsubscribe_calls(&self) -> u32 {
        self.state.lock().unsubscribe_calls
    }
}

impl Default for SimulatedGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBackend for SimulatedGpio {
    fn name(&self) -> &'static str {
        super::BACKEND_NAME
    }

    fn configure_input(&self, channel: ChannelId) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        if state.external_claims.contains(&channel) {
            return Err(GpioError::ChannelBusy(channel));
        }
        let line = state.line_mut(channel, self.max_channel)?;
        if line.claimed {
            return Err(GpioError::ChannelBusy(channel));
        }
        line.claimed = true;
        debug!("Simulated line {} configured as input", channel);
        Ok(())
    }

    fn set_pull(&self, channel: ChannelId, pull: Pull) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        state.line_mut(channel, self.max_channel)?.pull = pull;
        Ok(())
    }

    fn set_debounce(&self, channel: ChannelId, window: Duration) -> Result<(), GpioError> {
        let mut state = self.state.lock();
        let line = state.line_mut(channel, self.max_channel)?;
        line.debounce = window;
        line.debounce_calls += 1;
        Ok(())
    }

    fn read_level(&self, channel: ChannelId) -> Result<Level, GpioError> {
        let mut state = self.state.lock();
        Ok(state.line_mut(channel, self.max_channel)?.level())
    }

    fn subscribe_edge(
        &self,
        channel: ChannelId,
        trigger: EdgeTrigger,
        handler: EdgeHandler,
    ) -> Result<SubscriptionId, GpioError> {
        let mut state = self.state.lock();
        state.line_mut(channel, self.max_channel)?;
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.subscriptions.insert(
            id,
            Subscription {
                channel,
                trigger,
                handler,
                gate: Arc::new(RwLock::new(())),
            },
        );
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), GpioError> {
        let gate = {
            let mut state = self.state.lock();
            let Some(subscription) = state.subscriptions.remove(&id) else {
                return Err(GpioError::UnknownSubscription(id));
            };
            state.unsubscribe_calls += 1;
            subscription.gate
        };
        // Wait for deliveries that picked up the handler before removal.
        drop(gate.write());
        Ok(())
    }

    fn release(&self, channel: ChannelId) {
        if let Some(line) = self.state.lock().lines.get_mut(&channel) {
            line.claimed = false;
        }
    }
}
