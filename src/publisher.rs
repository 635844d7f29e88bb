//! Publisher: pushes accepted fields to the messaging transport.
//!
//! One property message per accepted field, in [`Field::ALL`] order.  A
//! failed send never blocks the other fields and is never retried here;
//! the controller simply tries again on a later cycle.

use core::fmt::Write as _;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::MessagingPort;
use crate::sensors::Field;
use crate::validation::Verdicts;

/// Property name carrying each node's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyNaming {
    /// Every node publishes under the same property (e.g. `value`).
    Uniform(heapless::String<16>),
    /// Each node has its own property name.
    PerField {
        temperature: heapless::String<16>,
        humidity: heapless::String<16>,
        pressure: heapless::String<16>,
        supply_voltage: heapless::String<16>,
    },
}

impl PropertyNaming {
    /// `temperature/value`, `humidity/value`, ...
    pub fn value() -> Self {
        Self::Uniform(short("value"))
    }

    /// `temperature/degrees`, `humidity/relative`, `pressure/pressure`,
    /// `battery/voltage`.
    pub fn descriptive() -> Self {
        Self::PerField {
            temperature: short("degrees"),
            humidity: short("relative"),
            pressure: short("pressure"),
            supply_voltage: short("voltage"),
        }
    }

    pub fn property_for(&self, field: Field) -> &str {
        match self {
            Self::Uniform(name) => name.as_str(),
            Self::PerField {
                temperature,
                humidity,
                pressure,
                supply_voltage,
            } => match field {
                Field::Temperature => temperature.as_str(),
                Field::Humidity => humidity.as_str(),
                Field::Pressure => pressure.as_str(),
                Field::SupplyVoltage => supply_voltage.as_str(),
            },
        }
    }

    pub fn is_well_formed(&self) -> bool {
        Field::ALL.iter().all(|f| {
            let p = self.property_for(*f);
            !p.is_empty() && p != "unit" && !p.contains('/')
        })
    }
}

fn short(s: &str) -> heapless::String<16> {
    let mut out = heapless::String::new();
    let _ = out.push_str(s);
    out
}

/// Fields that reached the transport during one publish pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    sent: heapless::Vec<Field, { Field::COUNT }>,
}

impl PublishReport {
    pub fn contains(&self, field: Field) -> bool {
        self.sent.contains(&field)
    }

    pub fn any_sent(&self) -> bool {
        !self.sent.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.sent
    }

    fn record(&mut self, field: Field) {
        // Capacity equals the number of fields; each is recorded once.
        let _ = self.sent.push(field);
    }
}

/// Decimal text for a published value: shortest round-trip form, always
/// with a fractional part (`55.0`, `22.5`, `1000.0`).
pub fn format_value(value: f32) -> heapless::String<48> {
    let mut out = heapless::String::new();
    let _ = write!(out, "{value}");
    if value.is_finite() && !out.contains('.') {
        let _ = out.push_str(".0");
    }
    out
}

pub struct Publisher {
    naming: PropertyNaming,
}

impl Publisher {
    pub fn new(naming: PropertyNaming) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> &PropertyNaming {
        &self.naming
    }

    /// Send every accepted field.  Returns the fields that went out.
    pub fn publish<M: MessagingPort + ?Sized>(
        &self,
        messaging: &mut M,
        verdicts: &Verdicts,
    ) -> PublishReport {
        let mut report = PublishReport::default();
        for (field, value) in verdicts.accepted() {
            let text = format_value(value);
            let property = self.naming.property_for(field);
            match messaging.publish_property(field.node_id(), property, &text) {
                Ok(()) => report.record(field),
                Err(e) => warn!("publish {}/{} failed: {}", field.node_id(), property, e),
            }
        }
        report
    }

    /// Publish the static `unit` property of every node.
    pub fn advertise_units<M: MessagingPort + ?Sized>(&self, messaging: &mut M) -> PublishReport {
        let mut report = PublishReport::default();
        for field in Field::ALL {
            match messaging.publish_property(field.node_id(), "unit", field.unit()) {
                Ok(()) => report.record(field),
                Err(e) => warn!("unit advert for {} failed: {}", field.node_id(), e),
            }
        }
        report
    }
}
