//! BME280 sensor adapter over I2C.
//!
//! Implements [`SensorPort`] on top of the `bme280` driver crate.  The
//! driver reports pressure in pascal; the port speaks hPa.  A failed
//! measurement yields an all-`None` sample so the validator drops every
//! field for that cycle instead of publishing stale values.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info, warn};

use crate::app::ports::{RawSample, SensorPort};
use crate::error::SensorError;

/// SDO tied to GND.
pub const PRIMARY_ADDRESS: u8 = 0x76;

pub struct Bme280Sensor<I2C, D> {
    driver: bme280::i2c::BME280<I2C>,
    delay: D,
    address: u8,
}

impl<I2C, D> Bme280Sensor<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, address: u8, delay: D) -> Self {
        Self {
            driver: bme280::i2c::BME280::new(i2c, address),
            delay,
            address,
        }
    }
}

impl<I2C, D> SensorPort for Bme280Sensor<I2C, D>
where
    I2C: I2c,
    I2C::Error: core::fmt::Debug,
    D: DelayNs,
{
    fn init(&mut self) -> Result<(), SensorError> {
        match self.driver.init(&mut self.delay) {
            Ok(()) => {
                info!("bme280: found at 0x{:02x}", self.address);
                Ok(())
            }
            Err(e) => {
                error!("bme280: no sensor at 0x{:02x} ({:?})", self.address, e);
                Err(SensorError::NotFound)
            }
        }
    }

    fn read_all(&mut self) -> RawSample {
        match self.driver.measure(&mut self.delay) {
            Ok(m) => RawSample {
                temperature_c: Some(m.temperature),
                humidity_pct: Some(m.humidity),
                pressure_hpa: Some(m.pressure / 100.0),
            },
            Err(e) => {
                warn!("bme280: {} ({:?})", SensorError::ReadFailed, e);
                RawSample::default()
            }
        }
    }
}
