//! One environmental sample and the fields it is made of.

use serde::{Deserialize, Serialize};

/// The four measured quantities.  Order matters: it is the publish order
/// and the index into [`Verdicts`](crate::validation::Verdicts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Field {
    Temperature = 0,
    Humidity = 1,
    Pressure = 2,
    SupplyVoltage = 3,
}

impl Field {
    pub const COUNT: usize = 4;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Temperature,
        Field::Humidity,
        Field::Pressure,
        Field::SupplyVoltage,
    ];

    /// Homie node id the field is published under.
    pub const fn node_id(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Pressure => "pressure",
            Self::SupplyVoltage => "battery",
        }
    }

    /// Human-readable node name (`$name` attribute).
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Pressure => "Pressure",
            Self::SupplyVoltage => "Voltage",
        }
    }

    /// Unit advertised once per boot on the node's `unit` property.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "C",
            Self::Humidity => "%",
            Self::Pressure => "hPa",
            Self::SupplyVoltage => "V",
        }
    }
}

/// A single calibrated sample.  `None` marks a field the hardware failed
/// to deliver; there is no substitute value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    temperature_c: Option<f32>,
    humidity_pct: Option<f32>,
    pressure_hpa: Option<f32>,
    supply_v: Option<f32>,
}

impl Reading {
    /// Build a reading; NaN and infinite inputs become unavailable.
    pub fn new(
        temperature_c: Option<f32>,
        humidity_pct: Option<f32>,
        pressure_hpa: Option<f32>,
        supply_v: Option<f32>,
    ) -> Self {
        Self {
            temperature_c: finite(temperature_c),
            humidity_pct: finite(humidity_pct),
            pressure_hpa: finite(pressure_hpa),
            supply_v: finite(supply_v),
        }
    }

    pub fn get(&self, field: Field) -> Option<f32> {
        match field {
            Field::Temperature => self.temperature_c,
            Field::Humidity => self.humidity_pct,
            Field::Pressure => self.pressure_hpa,
            Field::SupplyVoltage => self.supply_v,
        }
    }

    /// `true` when every field carries a value.
    pub fn is_complete(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_some())
    }

    /// `true` when at least one BME280 channel came back.  The supply
    /// rail is measured separately and does not count.
    pub fn has_sensor_data(&self) -> bool {
        self.temperature_c.is_some() || self.humidity_pct.is_some() || self.pressure_hpa.is_some()
    }
}

fn finite(v: Option<f32>) -> Option<f32> {
    v.filter(|x| x.is_finite())
}
