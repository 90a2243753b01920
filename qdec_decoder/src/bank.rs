//! Encoder bank.
//!
//! Builds every encoder listed in a [`QdecConfig`] on one backend and tears
//! them down together. Encoders in a bank share nothing but the backend;
//! each keeps its own lock, position and notifier.

use crate::encoder::{Encoder, EncoderOptions};
use crate::error::EncoderError;
use crate::notifier::Notifier;
use qdec_common::config::{EncoderConfig, QdecConfig};
use qdec_common::gpio::GpioBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The configured set of encoders.
#[derive(Debug)]
pub struct EncoderBank {
    encoders: Vec<Encoder>,
}

impl EncoderBank {
    /// Create one encoder per configuration entry, in order.
    ///
    /// `notifier_for` supplies the notifier of each entry. If any encoder
    /// fails, the ones already created are cancelled before returning.
    pub fn from_config<F>(
        backend: Arc<dyn GpioBackend>,
        config: &QdecConfig,
        mut notifier_for: F,
    ) -> Result<Self, EncoderError>
    where
        F: FnMut(&EncoderConfig) -> Result<Arc<dyn Notifier>, EncoderError>,
    {
        let mut encoders = Vec::with_capacity(config.encoders.len());
        for entry in &config.encoders {
            let options = EncoderOptions::from_config(entry, &config.decoder);
            let notifier = notifier_for(entry)?;
            encoders.push(Encoder::create(Arc::clone(&backend), &options, notifier)?);
        }

        info!(
            "Encoder bank ready: {} encoder(s) on backend '{}'",
            encoders.len(),
            backend.name()
        );
        Ok(Self { encoders })
    }

    /// Encoder by name.
    pub fn get(&self, name: &str) -> Option<&Encoder> {
        self.encoders.iter().find(|e| e.name() == name)
    }

    /// Encoders in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Encoder> {
        self.encoders.iter()
    }

    /// Number of encoders.
    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    /// True if the bank holds no encoder.
    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }

    /// Name and position of each encoder, read one at a time.
    pub fn positions(&self) -> Vec<(&str, i64)> {
        self.encoders
            .iter()
            .map(|e| (e.name(), e.get_position()))
            .collect()
    }

    /// Apply a glitch filter window to every encoder.
    ///
    /// Returns how many encoders changed.
    pub fn set_noise_filter(&self, window: Duration) -> Result<usize, EncoderError> {
        let mut changed = 0;
        for encoder in &self.encoders {
            if encoder.set_noise_filter(window)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Cancel every encoder. Idempotent.
    pub fn cancel(&self) {
        for encoder in &self.encoders {
            encoder.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulation::SimulatedGpio;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    type Log = Arc<Mutex<HashMap<String, Vec<i64>>>>;

    fn per_encoder_log() -> (
        Log,
        impl FnMut(&EncoderConfig) -> Result<Arc<dyn Notifier>, EncoderError>,
    ) {
        let log: Log = Arc::new(Mutex::new(HashMap::new()));
        let factory_log = Arc::clone(&log);
        let factory = move |entry: &EncoderConfig| {
            let log = Arc::clone(&factory_log);
            let name = entry.name.clone();
            let notifier: Arc<dyn Notifier> = Arc::new(move |p: i64| {
                log.lock().entry(name.clone()).or_default().push(p)
            });
            Ok::<_, EncoderError>(notifier)
        };
        (log, factory)
    }

    #[test]
    fn default_config_builds_two_independent_encoders() {
        let gpio = Arc::new(SimulatedGpio::new());
        let (log, factory) = per_encoder_log();
        let bank = EncoderBank::from_config(gpio.clone(), &QdecConfig::default(), factory).unwrap();
        assert_eq!(bank.len(), 2);

        gpio.rotate(23, 24, 4);
        gpio.rotate(17, 27, -8);

        assert_eq!(bank.get("encoder_a").unwrap().get_position(), 1);
        assert_eq!(bank.get("encoder_b").unwrap().get_position(), -2);
        assert_eq!(bank.positions(), vec![("encoder_a", 1), ("encoder_b", -2)]);

        let log = log.lock();
        assert_eq!(log["encoder_a"], vec![1]);
        assert_eq!(log["encoder_b"], vec![-1, -2]);
    }

    #[test]
    fn failure_cancels_earlier_encoders() {
        let gpio = Arc::new(SimulatedGpio::new());
        gpio.claim_externally(27);
        let (_, factory) = per_encoder_log();

        let result = EncoderBank::from_config(gpio.clone(), &QdecConfig::default(), factory);
        assert!(matches!(result, Err(EncoderError::BackendUnavailable(_))));
        for channel in [23, 24, 17] {
            assert!(!gpio.is_claimed(channel), "GPIO {channel} still claimed");
        }
        assert_eq!(gpio.subscriber_count(23), 0);
    }

    #[test]
    fn noise_filter_applies_to_all() {
        let gpio = Arc::new(SimulatedGpio::new());
        let (_, factory) = per_encoder_log();
        let bank = EncoderBank::from_config(gpio.clone(), &QdecConfig::default(), factory).unwrap();

        assert_eq!(bank.set_noise_filter(Duration::from_micros(1000)).unwrap(), 0);
        assert_eq!(bank.set_noise_filter(Duration::from_micros(50)).unwrap(), 2);
        for channel in [23, 24, 17, 27] {
            assert_eq!(gpio.debounce(channel), Duration::from_micros(50));
        }
    }

    #[test]
    fn cancel_stops_all() {
        let gpio = Arc::new(SimulatedGpio::new());
        let (log, factory) = per_encoder_log();
        let bank = EncoderBank::from_config(gpio.clone(), &QdecConfig::default(), factory).unwrap();

        bank.cancel();
        bank.cancel();
        gpio.rotate(23, 24, 4);
        assert!(bank.iter().all(|e| !e.is_live()));
        assert!(log.lock().is_empty());
    }
}
