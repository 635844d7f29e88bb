//! Sensor subsystem: the [`SensorSampler`] and the [`Reading`] it produces.
//!
//! The sampler owns no hardware.  Each cycle it performs exactly one
//! [`SensorPort::read_all`] plus one supply-voltage read, applies the
//! pressure calibration offset and hands back an immutable [`Reading`].

pub mod reading;

use log::debug;

use crate::app::ports::{PowerPort, SensorPort};
use crate::error::Result;
pub use reading::{Field, Reading};

/// Turns one bus transaction into a calibrated [`Reading`].
#[derive(Debug, Clone, Copy)]
pub struct SensorSampler {
    /// Added to the raw pressure (hPa) before validation.
    pressure_offset_hpa: f32,
    trace: bool,
}

impl SensorSampler {
    pub fn new(pressure_offset_hpa: f32, trace: bool) -> Self {
        Self {
            pressure_offset_hpa,
            trace,
        }
    }

    /// Probe the sensor once at boot.  An error here is fatal for the boot.
    pub fn init<S: SensorPort + ?Sized>(&self, sensor: &mut S) -> Result<()> {
        sensor.init()?;
        Ok(())
    }

    /// Take one sample.  Never touches the bus more than once.
    pub fn sample<H: SensorPort + PowerPort + ?Sized>(&self, hw: &mut H) -> Reading {
        let raw = hw.read_all();
        let supply_v = hw.battery_voltage();
        let pressure = raw.pressure_hpa.map(|p| p + self.pressure_offset_hpa);

        let reading = Reading::new(raw.temperature_c, raw.humidity_pct, pressure, supply_v);
        if self.trace {
            debug!(
                "sample: t={:?}C p={:?}hPa h={:?}% v={:?}V",
                reading.get(Field::Temperature),
                reading.get(Field::Pressure),
                reading.get(Field::Humidity),
                reading.get(Field::SupplyVoltage),
            );
        }
        reading
    }
}
