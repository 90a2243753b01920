//! Raspberry Pi GPIO backend (`rppal`).
//!
//! Lines are claimed through `/dev/gpiomem`. Edge delivery uses rppal's
//! asynchronous interrupts, which run the handler on a per-pin interrupt
//! thread. rppal applies debounce when the interrupt is registered, so a
//! window change on a subscribed line re-registers its interrupt.

use parking_lot::Mutex;
use qdec_common::gpio::{
    ChannelId, EdgeEvent, EdgeHandler, EdgeLevel, EdgeTrigger, GpioBackend, GpioError, Level,
    Pull, SubscriptionId,
};
use rppal::gpio::{Event, Gpio, InputPin, Trigger};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Registry name of the Raspberry Pi backend.
pub const BACKEND_NAME: &str = "rppal";

struct PinSlot {
    pin: InputPin,
    debounce: Duration,
    subscription: Option<(SubscriptionId, EdgeTrigger, EdgeHandler)>,
}

#[derive(Default)]
struct PinTable {
    pins: HashMap<ChannelId, PinSlot>,
    next_id: u64,
}

/// GPIO backend over rppal.
pub struct RaspberryGpio {
    gpio: Gpio,
    table: Mutex<PinTable>,
}

impl RaspberryGpio {
    /// Open the GPIO peripheral.
    pub fn open() -> Result<Self, GpioError> {
        let gpio = Gpio::new().map_err(|e| GpioError::Unavailable(e.to_string()))?;
        info!("Raspberry Pi GPIO opened");
        Ok(Self {
            gpio,
            table: Mutex::new(PinTable::default()),
        })
    }

    fn pin_number(channel: ChannelId) -> Result<u8, GpioError> {
        u8::try_from(channel).map_err(|_| GpioError::InvalidChannel(channel))
    }

    fn claim(&self, channel: ChannelId, pull: Pull) -> Result<InputPin, GpioError> {
        let pin = self
            .gpio
            .get(Self::pin_number(channel)?)
            .map_err(|e| match e {
                rppal::gpio::Error::PinNotAvailable(_) => GpioError::InvalidChannel(channel),
                rppal::gpio::Error::PinUsed(_) => GpioError::ChannelBusy(channel),
                other => GpioError::Io(other.to_string()),
            })?;
        Ok(match pull {
            Pull::Up => pin.into_input_pullup(),
            Pull::Down => pin.into_input_pulldown(),
            Pull::Off => pin.into_input(),
        })
    }

    fn arm(slot: &mut PinSlot, channel: ChannelId) -> Result<(), GpioError> {
        let Some((_, trigger, handler)) = &slot.subscription else {
            return Ok(());
        };
        let trigger = match trigger {
            EdgeTrigger::Rising => Trigger::RisingEdge,
            EdgeTrigger::Falling => Trigger::FallingEdge,
            EdgeTrigger::Both => Trigger::Both,
        };
        let debounce = (!slot.debounce.is_zero()).then_some(slot.debounce);
        let handler = Arc::clone(handler);
        slot.pin
            .set_async_interrupt(trigger, debounce, move |event: Event| {
                handler(EdgeEvent {
                    channel,
                    level: edge_level(event.trigger),
                    timestamp: event.timestamp,
                })
            })
            .map_err(|e| GpioError::Io(e.to_string()))
    }
}

fn edge_level(trigger: Trigger) -> EdgeLevel {
    match trigger {
        Trigger::RisingEdge => EdgeLevel::High,
        Trigger::FallingEdge => EdgeLevel::Low,
        _ => EdgeLevel::Timeout,
    }
}

impl GpioBackend for RaspberryGpio {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn configure_input(&self, channel: ChannelId) -> Result<(), GpioError> {
        let mut table = self.table.lock();
        if table.pins.contains_key(&channel) {
            return Err(GpioError::ChannelBusy(channel));
        }
        let pin = self.claim(channel, Pull::Off)?;
        table.pins.insert(
            channel,
            PinSlot {
                pin,
                debounce: Duration::ZERO,
                subscription: None,
            },
        );
        debug!("GPIO {} configured as input", channel);
        Ok(())
    }

    fn set_pull(&self, channel: ChannelId, pull: Pull) -> Result<(), GpioError> {
        let mut table = self.table.lock();
        let PinSlot {
            mut pin,
            debounce,
            subscription,
        } = table
            .pins
            .remove(&channel)
            .ok_or(GpioError::InvalidChannel(channel))?;
        // rppal fixes the bias when the pin is turned into an input, so the
        // line is handed back and claimed again.
        let _ = pin.clear_async_interrupt();
        drop(pin);
        let mut slot = PinSlot {
            pin: self.claim(channel, pull)?,
            debounce,
            subscription,
        };
        Self::arm(&mut slot, channel)?;
        table.pins.insert(channel, slot);
        Ok(())
    }

    fn set_debounce(&self, channel: ChannelId, window: Duration) -> Result<(), GpioError> {
        let mut table = self.table.lock();
        let slot = table
            .pins
            .get_mut(&channel)
            .ok_or(GpioError::InvalidChannel(channel))?;
        slot.debounce = window;
        if slot.subscription.is_some() {
            slot.pin
                .clear_async_interrupt()
                .map_err(|e| GpioError::Io(e.to_string()))?;
            Self::arm(slot, channel)?;
        }
        Ok(())
    }

    fn read_level(&self, channel: ChannelId) -> Result<Level, GpioError> {
        let table = self.table.lock();
        let slot = table
            .pins
            .get(&channel)
            .ok_or(GpioError::InvalidChannel(channel))?;
        Ok(Level::from(slot.pin.is_high()))
    }

    fn subscribe_edge(
        &self,
        channel: ChannelId,
        trigger: EdgeTrigger,
        handler: EdgeHandler,
    ) -> Result<SubscriptionId, GpioError> {
        let mut table = self.table.lock();
        let id = SubscriptionId(table.next_id);
        let slot = table
            .pins
            .get_mut(&channel)
            .ok_or(GpioError::InvalidChannel(channel))?;
        if slot.subscription.is_some() {
            return Err(GpioError::ChannelBusy(channel));
        }
        slot.subscription = Some((id, trigger, handler));
        if let Err(e) = Self::arm(slot, channel) {
            slot.subscription = None;
            return Err(e);
        }
        table.next_id += 1;
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), GpioError> {
        let mut table = self.table.lock();
        let slot = table
            .pins
            .values_mut()
            .find(|slot| matches!(&slot.subscription, Some((sub, _, _)) if *sub == id))
            .ok_or(GpioError::UnknownSubscription(id))?;
        // Joins the interrupt thread, so no handler runs after this returns.
        slot.pin
            .clear_async_interrupt()
            .map_err(|e| GpioError::Io(e.to_string()))?;
        slot.subscription = None;
        Ok(())
    }

    fn release(&self, channel: ChannelId) {
        if let Some(mut slot) = self.table.lock().pins.remove(&channel) {
            let _ = slot.pin.clear_async_interrupt();
        }
    }
}

/// Factory function to create a Raspberry Pi backend instance.
pub fn create_backend() -> Result<Arc<dyn GpioBackend>, GpioError> {
    Ok(Arc::new(RaspberryGpio::open()?))
}
