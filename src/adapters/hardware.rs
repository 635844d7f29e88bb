//! Hardware adapter: bundles the board peripherals behind the port traits.
//!
//! The controller wants one `&mut dyn NodeHardware`, while the board
//! exposes three independent pieces (the environmental sensor, the supply
//! rail / sleep timer, and the MQTT session).  [`HardwareAdapter`] owns all
//! three and forwards each port to the part that implements it.

use crate::app::ports::{MessagingPort, PowerPort, RawSample, SensorPort};
use crate::error::{CommsError, SensorError};

/// Concrete adapter that combines sensor, power and messaging.
pub struct HardwareAdapter<S, P, M> {
    sensor: S,
    power: P,
    messaging: M,
}

impl<S, P, M> HardwareAdapter<S, P, M>
where
    S: SensorPort,
    P: PowerPort,
    M: MessagingPort,
{
    pub fn new(sensor: S, power: P, messaging: M) -> Self {
        Self {
            sensor,
            power,
            messaging,
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn power(&self) -> &P {
        &self.power
    }

    pub fn messaging(&self) -> &M {
        &self.messaging
    }

    pub fn messaging_mut(&mut self) -> &mut M {
        &mut self.messaging
    }
}

// ── SensorPort ────────────────────────────────────────────────

impl<S: SensorPort, P, M> SensorPort for HardwareAdapter<S, P, M> {
    fn init(&mut self) -> Result<(), SensorError> {
        self.sensor.init()
    }

    fn read_all(&mut self) -> RawSample {
        self.sensor.read_all()
    }
}

// ── PowerPort ─────────────────────────────────────────────────

impl<S, P: PowerPort, M> PowerPort for HardwareAdapter<S, P, M> {
    fn battery_voltage(&mut self) -> Option<f32> {
        self.power.battery_voltage()
    }

    fn deep_sleep(&mut self, duration_us: u64) {
        self.power.deep_sleep(duration_us);
    }
}

// ── MessagingPort ─────────────────────────────────────────────

impl<S, P, M: MessagingPort> MessagingPort for HardwareAdapter<S, P, M> {
    fn is_connected(&self) -> bool {
        self.messaging.is_connected()
    }

    fn publish_property(
        &mut self,
        node: &str,
        property: &str,
        value: &str,
    ) -> Result<(), CommsError> {
        self.messaging.publish_property(node, property, value)
    }

    fn request_prepare_to_sleep(&mut self) {
        self.messaging.request_prepare_to_sleep();
    }
}
