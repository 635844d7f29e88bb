//! Homie convention helpers: topic layout, device attributes and the
//! session flags shared with the MQTT event task.
//!
//! ```text
//! homie/<device>/$state                ready | sleeping | lost
//! homie/<device>/<node>/<property>     "22.5"
//! ```
//!
//! Everything here is plain data and atomics, so it is tested on the host;
//! [`super::mqtt`] only moves these topics and payloads over the wire.

use core::fmt::Write;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::NodeConfig;
use crate::error::CommsError;
use crate::sensors::Field;

pub const BASE_TOPIC: &str = "homie";
pub const CONVENTION_VERSION: &str = "3.0.1";
pub const IMPLEMENTATION: &str = "esp32";

pub type Topic = heapless::String<128>;
pub type Payload = heapless::String<64>;

/// Device lifecycle published on `$state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Init,
    Ready,
    Sleeping,
    Lost,
}

impl DeviceState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Ready => "ready",
            Self::Sleeping => "sleeping",
            Self::Lost => "lost",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Topics
// ───────────────────────────────────────────────────────────────

/// `homie/<device>/<node>/<property>`.
pub fn topic(device: &str, node: &str, property: &str) -> Result<Topic, CommsError> {
    let mut t = Topic::new();
    write!(t, "{}/{}/{}/{}", BASE_TOPIC, device, node, property)
        .map_err(|_| CommsError::TopicTooLong)?;
    Ok(t)
}

/// `homie/<device>/<attribute>`, e.g. `$state` or `$fw/name`.
pub fn device_topic(device: &str, attribute: &str) -> Result<Topic, CommsError> {
    let mut t = Topic::new();
    write!(t, "{}/{}/{}", BASE_TOPIC, device, attribute).map_err(|_| CommsError::TopicTooLong)?;
    Ok(t)
}

// ───────────────────────────────────────────────────────────────
// Attributes
// ───────────────────────────────────────────────────────────────

/// One retained attribute message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub topic: Topic,
    pub payload: Payload,
}

/// Device and node attributes published once per MQTT session, before
/// `$state` flips to `ready`.
pub fn device_attributes(config: &NodeConfig) -> Result<heapless::Vec<Attribute, 24>, CommsError> {
    let device = config.device_id.as_str();
    let mut out = heapless::Vec::new();

    let mut nodes = Payload::new();
    for (i, field) in Field::ALL.iter().enumerate() {
        if i > 0 {
            push_str(&mut nodes, ",")?;
        }
        push_str(&mut nodes, field.node_id())?;
    }

    let device_attrs: [(&str, &str); 6] = [
        ("$homie", CONVENTION_VERSION),
        ("$name", config.firmware.name.as_str()),
        ("$fw/name", config.firmware.name.as_str()),
        ("$fw/version", config.firmware.version.as_str()),
        ("$implementation", IMPLEMENTATION),
        ("$nodes", nodes.as_str()),
    ];
    for (attr, value) in device_attrs {
        push_attr(&mut out, device_topic(device, attr)?, value)?;
    }

    for field in Field::ALL {
        let node = field.node_id();
        let mut properties = Payload::new();
        push_str(&mut properties, config.naming.property_for(field))?;
        push_str(&mut properties, ",unit")?;

        push_attr(&mut out, topic(device, node, "$name")?, field.display_name())?;
        push_attr(&mut out, topic(device, node, "$type")?, "sensor")?;
        push_attr(&mut out, topic(device, node, "$properties")?, &properties)?;
    }

    Ok(out)
}

fn push_str(s: &mut Payload, part: &str) -> Result<(), CommsError> {
    s.push_str(part).map_err(|_| CommsError::PublishFailed)
}

fn push_attr(
    out: &mut heapless::Vec<Attribute, 24>,
    topic: Topic,
    value: &str,
) -> Result<(), CommsError> {
    let mut payload = Payload::new();
    push_str(&mut payload, value)?;
    out.push(Attribute { topic, payload })
        .map_err(|_| CommsError::PublishFailed)
}

// ───────────────────────────────────────────────────────────────
// Session flags (written by the MQTT event task, read by the main loop)
// ───────────────────────────────────────────────────────────────

/// Lock-free state shared between the MQTT callback and the main loop.
///
/// The sleep handshake works on message ids: the `$state = sleeping`
/// publish is armed with its id, and the broker's PUBACK for that id
/// means everything queued before it has been delivered.
#[derive(Debug, Default)]
pub struct SessionFlags {
    connected: AtomicBool,
    /// Set on every (re)connect until the attributes have been re-sent.
    fresh_session: AtomicBool,
    /// Message id of the pending `$state = sleeping` publish, 0 = none.
    sleep_msg_id: AtomicU32,
    /// Most recent PUBACK id.  The ack can land before `publish` returns
    /// the id to the main task.
    last_acked_id: AtomicU32,
    ready_to_sleep: AtomicBool,
}

impl SessionFlags {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            fresh_session: AtomicBool::new(false),
            sleep_msg_id: AtomicU32::new(0),
            last_acked_id: AtomicU32::new(0),
            ready_to_sleep: AtomicBool::new(false),
        }
    }

    pub fn on_connected(&self) {
        self.fresh_session.store(true, Ordering::Release);
        self.connected.store(true, Ordering::Release);
    }

    /// `true` once per broker session, for the first caller after connect.
    pub fn take_fresh_session(&self) -> bool {
        self.fresh_session.swap(false, Ordering::AcqRel)
    }

    pub fn on_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Wait for the broker to acknowledge `msg_id`, or latch at once if
    /// it already has.
    pub fn arm_sleep(&self, msg_id: u32) {
        self.sleep_msg_id.store(msg_id, Ordering::SeqCst);
        if msg_id != 0 && self.last_acked_id.load(Ordering::SeqCst) == msg_id {
            self.release_sleep(msg_id);
        }
    }

    /// Nothing left to flush; ready immediately.
    pub fn set_ready_to_sleep(&self) {
        self.ready_to_sleep.store(true, Ordering::Release);
    }

    /// Broker acknowledged `msg_id`.
    pub fn on_published(&self, msg_id: u32) {
        if msg_id == 0 {
            return;
        }
        self.last_acked_id.store(msg_id, Ordering::SeqCst);
        self.release_sleep(msg_id);
    }

    fn release_sleep(&self, msg_id: u32) {
        if self
            .sleep_msg_id
            .compare_exchange(msg_id, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.ready_to_sleep.store(true, Ordering::Release);
        }
    }

    /// Consume the ready-to-sleep latch.
    pub fn take_ready_to_sleep(&self) -> bool {
        self.ready_to_sleep.swap(false, Ordering::AcqRel)
    }
}
