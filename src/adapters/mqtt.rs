//! MQTT messaging adapter (ESP-IDF only).
//!
//! Implements [`MessagingPort`] over `esp-idf-svc`'s `EspMqttClient`.
//! Topics follow the Homie layout from [`super::homie`]; every property is
//! published retained with QoS 1 so a subscriber that connects between
//! two sleep cycles still sees the last reading.
//!
//! The client's event callback runs on the ESP-IDF MQTT task.  It only
//! touches [`SessionFlags`]; the main loop reads them back through the
//! [`Uplink`] hooks.

use std::sync::Arc;

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};
use log::{debug, info, warn};

use crate::app::ports::MessagingPort;
use crate::config::NodeConfig;
use crate::error::{CommsError, Error, Result};

use super::homie::{self, DeviceState, SessionFlags};
use super::uplink::Uplink;

pub struct MqttMessaging {
    client: EspMqttClient<'static>,
    flags: Arc<SessionFlags>,
    config: NodeConfig,
}

impl MqttMessaging {
    /// Connect to `url` with a Homie last-will of `$state = lost`.
    pub fn connect(url: &str, config: &NodeConfig) -> Result<Self> {
        let flags = Arc::new(SessionFlags::new());
        let lwt_topic = homie::device_topic(&config.device_id, "$state")?;

        let conf = MqttClientConfiguration {
            client_id: Some(config.device_id.as_str()),
            lwt: Some(LwtConfiguration {
                topic: lwt_topic.as_str(),
                payload: DeviceState::Lost.as_str().as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };

        let cb_flags = Arc::clone(&flags);
        let client = EspMqttClient::new_cb(url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                info!("mqtt: connected");
                cb_flags.on_connected();
            }
            EventPayload::Disconnected => {
                warn!("mqtt: disconnected");
                cb_flags.on_disconnected();
            }
            EventPayload::Published(id) => {
                debug!("mqtt: ack {}", id);
                cb_flags.on_published(id);
            }
            EventPayload::Error(e) => warn!("mqtt: {:?}", e),
            _ => {}
        })
        .map_err(|_| Error::Init("MQTT client init failed"))?;

        info!("mqtt: client started for {}", url);
        Ok(Self {
            client,
            flags,
            config: config.clone(),
        })
    }

    fn announce(&mut self) -> core::result::Result<(), CommsError> {
        self.publish_state(DeviceState::Init)?;
        for attr in homie::device_attributes(&self.config)? {
            self.publish_raw(&attr.topic, attr.payload.as_bytes())?;
        }
        self.publish_state(DeviceState::Ready)?;
        Ok(())
    }

    fn publish_state(&mut self, state: DeviceState) -> core::result::Result<u32, CommsError> {
        let topic = homie::device_topic(&self.config.device_id, "$state")?;
        self.publish_raw(&topic, state.as_str().as_bytes())
    }

    fn publish_raw(&mut self, topic: &str, payload: &[u8]) -> core::result::Result<u32, CommsError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .map_err(|e| {
                debug!("mqtt: publish {} failed ({:?})", topic, e);
                CommsError::PublishFailed
            })
    }
}

impl MessagingPort for MqttMessaging {
    fn is_connected(&self) -> bool {
        self.flags.is_connected()
    }

    fn publish_property(
        &mut self,
        node: &str,
        property: &str,
        value: &str,
    ) -> core::result::Result<(), CommsError> {
        if !self.flags.is_connected() {
            return Err(CommsError::NotConnected);
        }
        let topic = homie::topic(&self.config.device_id, node, property)?;
        self.publish_raw(&topic, value.as_bytes()).map(|_| ())
    }

    fn request_prepare_to_sleep(&mut self) {
        if !self.flags.is_connected() {
            // Nothing can be flushed without a session.
            self.flags.set_ready_to_sleep();
            return;
        }
        match self.publish_state(DeviceState::Sleeping) {
            Ok(id) => self.flags.arm_sleep(id),
            Err(e) => {
                warn!("mqtt: could not announce sleep ({})", e);
                self.flags.set_ready_to_sleep();
            }
        }
    }
}

impl Uplink for MqttMessaging {
    /// Re-announce the device after every (re)connect.
    fn poll(&mut self) {
        if !self.flags.is_connected() || !self.flags.take_fresh_session() {
            return;
        }
        if let Err(e) = self.announce() {
            warn!("mqtt: announce failed ({})", e);
        }
    }

    /// The broker acknowledged the `sleeping` state.
    fn take_ready_to_sleep(&self) -> bool {
        self.flags.take_ready_to_sleep()
    }
}
