//! Registry of GPIO backends.
//!
//! Maps backend names to factory functions. Built at startup, filled by
//! [`register_builtin_backends`](crate::backends::register_builtin_backends)
//! and consulted once when the configured backend is opened.

use crate::error::EncoderError;
use qdec_common::gpio::{BackendFactory, GpioBackend};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available GPIO backends.
pub struct BackendRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every backend compiled into this build.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::backends::register_builtin_backends(&mut registry);
        registry
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.contains_key(name) {
            panic!("Backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).copied()
    }

    /// Open a backend by name.
    ///
    /// # Errors
    /// `EncoderError::BackendNotFound` if the name is unknown; the factory's
    /// own failure otherwise (typically `BackendUnavailable`).
    pub fn create(&self, name: &str) -> Result<Arc<dyn GpioBackend>, EncoderError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| EncoderError::BackendNotFound(name.to_string()))?;
        Ok(factory()?)
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
