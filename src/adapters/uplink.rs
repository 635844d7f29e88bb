//! Main-loop side of the messaging transport.
//!
//! [`MessagingPort`] is what the controller sees.  [`Uplink`] adds the two
//! hooks `main` drives between ticks: session housekeeping and the
//! ready-to-sleep latch set from the transport's own task.
//!
//! [`OfflineUplink`] stands in when the node has no credentials or the
//! MQTT client cannot be created.  It never connects, fails every publish
//! and is ready to sleep as soon as it is asked, so a sleep-cycle boot
//! still ends in deep sleep.

use log::info;

use crate::app::ports::MessagingPort;
use crate::error::CommsError;

use super::homie::SessionFlags;

pub trait Uplink: MessagingPort {
    /// Once per loop iteration, before the controller ticks.
    fn poll(&mut self) {}

    /// The transport has flushed after `request_prepare_to_sleep`
    /// (consumes the latch).
    fn take_ready_to_sleep(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct OfflineUplink {
    flags: SessionFlags,
}

impl OfflineUplink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessagingPort for OfflineUplink {
    fn is_connected(&self) -> bool {
        false
    }

    fn publish_property(&mut self, _: &str, _: &str, _: &str) -> Result<(), CommsError> {
        Err(CommsError::NotConnected)
    }

    fn request_prepare_to_sleep(&mut self) {
        info!("uplink(offline): nothing to flush");
        self.flags.set_ready_to_sleep();
    }
}

impl Uplink for OfflineUplink {
    fn take_ready_to_sleep(&self) -> bool {
        self.flags.take_ready_to_sleep()
    }
}
