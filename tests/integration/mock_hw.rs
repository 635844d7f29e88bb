//! Mock adapters for integration tests.
//!
//! `MockNode` implements every hardware port and records each call so
//! tests can assert on the full history without a sensor or broker.

use std::cell::Cell;

use envnode::app::events::AppEvent;
use envnode::app::ports::{
    ClockPort, EventSink, MessagingPort, PowerPort, RawSample, SensorPort,
};
use envnode::error::{CommsError, SensorError};

// ── Published message record ──────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub node: String,
    pub property: String,
    pub value: String,
}

// ── MockNode ──────────────────────────────────────────────────

pub struct MockNode {
    /// Sensor answers at init.
    pub sensor_present: bool,
    /// Returned by every `read_all`.
    pub raw: RawSample,
    pub supply_v: Option<f32>,
    pub connected: bool,
    /// Every publish fails with `PublishFailed` while set.
    pub fail_publish: bool,

    pub init_calls: u32,
    pub reads: u32,
    pub published: Vec<Published>,
    pub failed_publishes: u32,
    pub prepare_requests: u32,
    pub sleeps: Vec<u64>,
}

#[allow(dead_code)]
impl MockNode {
    /// Connected node with a healthy sensor reading `{22.5, 55.0, 984.0}`
    /// and a 3.3 V supply.
    pub fn new() -> Self {
        Self {
            sensor_present: true,
            raw: RawSample {
                temperature_c: Some(22.5),
                humidity_pct: Some(55.0),
                pressure_hpa: Some(984.0),
            },
            supply_v: Some(3.3),
            connected: true,
            fail_publish: false,
            init_calls: 0,
            reads: 0,
            published: Vec::new(),
            failed_publishes: 0,
            prepare_requests: 0,
            sleeps: Vec::new(),
        }
    }

    pub fn with_sample(
        mut self,
        t: Option<f32>,
        h: Option<f32>,
        p: Option<f32>,
        v: Option<f32>,
    ) -> Self {
        self.raw = RawSample {
            temperature_c: t,
            humidity_pct: h,
            pressure_hpa: p,
        };
        self.supply_v = v;
        self
    }

    /// Published values, excluding the `unit` advertisements.
    pub fn values(&self) -> Vec<(&str, &str, &str)> {
        self.published
            .iter()
            .filter(|p| p.property != "unit")
            .map(|p| (p.node.as_str(), p.property.as_str(), p.value.as_str()))
            .collect()
    }

    pub fn units(&self) -> Vec<(&str, &str)> {
        self.published
            .iter()
            .filter(|p| p.property == "unit")
            .map(|p| (p.node.as_str(), p.value.as_str()))
            .collect()
    }

    pub fn clear_published(&mut self) {
        self.published.clear();
    }
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockNode {
    fn init(&mut self) -> Result<(), SensorError> {
        self.init_calls += 1;
        if self.sensor_present {
            Ok(())
        } else {
            Err(SensorError::NotFound)
        }
    }

    fn read_all(&mut self) -> RawSample {
        self.reads += 1;
        self.raw
    }
}

impl PowerPort for MockNode {
    fn battery_voltage(&mut self) -> Option<f32> {
        self.supply_v
    }

    fn deep_sleep(&mut self, duration_us: u64) {
        self.sleeps.push(duration_us);
    }
}

impl MessagingPort for MockNode {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish_property(
        &mut self,
        node: &str,
        property: &str,
        value: &str,
    ) -> Result<(), CommsError> {
        if !self.connected {
            self.failed_publishes += 1;
            return Err(CommsError::NotConnected);
        }
        if self.fail_publish {
            self.failed_publishes += 1;
            return Err(CommsError::PublishFailed);
        }
        self.published.push(Published {
            node: node.to_string(),
            property: property.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn request_prepare_to_sleep(&mut self) {
        self.prepare_requests += 1;
    }
}

// ── MockClock ─────────────────────────────────────────────────

pub struct MockClock {
    now: Cell<u32>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(ms: u32) -> Self {
        Self { now: Cell::new(ms) }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }
}

impl ClockPort for MockClock {
    fn now_millis(&self) -> u32 {
        self.now.get()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
