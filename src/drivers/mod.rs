//! Low-level peripheral helpers that are not port adapters.

pub mod watchdog;
