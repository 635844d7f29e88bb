//! EnvNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and the
//! adapters `main` wires together.  All ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod publisher;
pub mod sensors;
pub mod validation;

pub mod adapters;
pub mod drivers;

pub use app::controller::PowerModeController;
pub use config::NodeConfig;
pub use error::{Error, Result};
