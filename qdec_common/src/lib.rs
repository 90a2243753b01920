//! QDEC Common Library
//!
//! This crate provides the types shared by all qdec workspace crates:
//! configuration loading, system constants and the GPIO edge-source
//! contract that decoder backends implement.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide constants
//! - [`gpio`] - GPIO edge-source trait, levels, edge events and errors
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use qdec_common::prelude::*;
//!
//! let config = QdecConfig::default();
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod gpio;
pub mod prelude;
