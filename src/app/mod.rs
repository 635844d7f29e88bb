//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules of the sensor node: the
//! power-mode controller and the events it emits.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod controller;
pub mod events;
pub mod ports;
