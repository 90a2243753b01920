//! Simulation backend module.
//!
//! Provides an in-memory GPIO edge source for development and testing
//! without physical hardware. Tests and the `--simulate` run drive line
//! levels through [`SimulatedGpio`] and receive decoded positions exactly as
//! they would from a real board.

mod backend;
mod line;

pub use backend::SimulatedGpio;
pub use line::quadrature_step;

use qdec_common::gpio::{GpioBackend, GpioError};
use std::sync::Arc;

/// Registry name of the simulation backend.
pub const BACKEND_NAME: &str = "simulation";

/// Factory function to create a simulation backend instance.
pub fn create_backend() -> Result<Arc<dyn GpioBackend>, GpioError> {
    Ok(Arc::new(SimulatedGpio::new()))
}
