//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PowerModeController (domain)
//! ```
//!
//! Driven adapters (BME280, supply monitor, MQTT client, clock, log sink)
//! implement these traits.  The controller consumes them via generics and
//! trait objects, so the domain core never touches hardware directly.

use crate::error::{CommsError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Calibrated values straight from the driver.  `None` (or NaN) marks a
/// field the driver failed to read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    /// Barometric pressure in hPa, before the calibration offset.
    pub pressure_hpa: Option<f32>,
}

/// Read-side port for the environmental sensor.
pub trait SensorPort {
    /// Probe and configure the device.  Called once per boot.
    fn init(&mut self) -> Result<(), SensorError>;

    /// One bus transaction returning every channel.
    fn read_all(&mut self) -> RawSample;
}

// ───────────────────────────────────────────────────────────────
// Power port (driven adapter: domain ↔ power management)
// ───────────────────────────────────────────────────────────────

pub trait PowerPort {
    /// Supply rail in volts, `None` if the board cannot measure it.
    fn battery_voltage(&mut self) -> Option<f32>;

    /// Power down for `duration_us`.  On hardware this never returns: the
    /// device comes back through a cold boot when the RTC timer fires.
    fn deep_sleep(&mut self, duration_us: u64);
}

// ───────────────────────────────────────────────────────────────
// Messaging port (driven adapter: domain → pub/sub transport)
// ───────────────────────────────────────────────────────────────

/// Property-oriented publish interface (Homie style: node + property).
///
/// The "ready to sleep" answer to [`request_prepare_to_sleep`] comes back
/// asynchronously through
/// [`PowerModeController::notify_ready_to_sleep`](super::controller::PowerModeController::notify_ready_to_sleep).
///
/// [`request_prepare_to_sleep`]: MessagingPort::request_prepare_to_sleep
pub trait MessagingPort {
    fn is_connected(&self) -> bool;

    /// Publish `value` as the text payload of `node/property`.
    fn publish_property(&mut self, node: &str, property: &str, value: &str)
    -> Result<(), CommsError>;

    /// Ask the transport to flush and close the session cleanly.
    fn request_prepare_to_sleep(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic milliseconds since boot.  Wraps at `u32::MAX`; callers
    /// must use `wrapping_sub` for intervals.
    fn now_millis(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / diagnostics)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Combined hardware view
// ───────────────────────────────────────────────────────────────

/// Everything a cycle touches, behind one `&mut`.  Passing a single
/// handle avoids a double mutable borrow when one adapter serves several
/// ports.
pub trait NodeHardware: SensorPort + PowerPort + MessagingPort {}

impl<T: SensorPort + PowerPort + MessagingPort> NodeHardware for T {}
