//! GPIO backend implementations.
//!
//! - [`simulation`] - In-memory edge source for development and testing
//! - `raspberry` - Raspberry Pi GPIO through `rppal` (feature `rppal`)
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `backends/`
//! 2. Implement the `GpioBackend` trait from `qdec_common::gpio`
//! 3. Register its factory in [`register_builtin_backends`]

#[cfg(feature = "rppal")]
pub mod raspberry;
pub mod simulation;

use crate::backend_registry::BackendRegistry;

/// Register all backends compiled into this build.
pub fn register_builtin_backends(registry: &mut BackendRegistry) {
    registry.register(simulation::BACKEND_NAME, simulation::create_backend);

    #[cfg(feature = "rppal")]
    registry.register(raspberry::BACKEND_NAME, raspberry::create_backend);
}
