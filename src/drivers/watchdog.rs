//! Task Watchdog Timer (TWDT) driver.
//!
//! Subscribes the main task to the ESP-IDF TWDT so a wedged I2C bus or a
//! stuck MQTT publish resets the node instead of draining the battery.
//! The main loop must call [`TaskWatchdog::feed`] on every iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::{info, warn};

/// Long enough to cover a WiFi association plus the sleep handshake.
pub const DEFAULT_TIMEOUT_MS: u32 = 30_000;

pub struct TaskWatchdog {
    timeout_ms: u32,
    subscribed: bool,
}

impl Default for TaskWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl TaskWatchdog {
    /// Reconfigure the TWDT to `timeout_ms` and subscribe the calling task.
    #[cfg(target_os = "espidf")]
    pub fn new(timeout_ms: u32) -> Self {
        // SAFETY: TWDT calls from the main task during startup.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                warn!("watchdog: reconfigure returned {} (may already be configured)", ret);
            }

            let ret = esp_task_wdt_add(core::ptr::null_mut());
            let subscribed = ret == ESP_OK;
            if subscribed {
                info!("watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
            } else {
                warn!("watchdog: failed to subscribe ({})", ret);
            }
            Self {
                timeout_ms,
                subscribed,
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_ms: u32) -> Self {
        if timeout_ms == 0 {
            warn!("watchdog(sim): zero timeout, watchdog disabled");
        } else {
            info!("watchdog(sim): no-op ({}ms)", timeout_ms);
        }
        Self {
            timeout_ms,
            subscribed: timeout_ms > 0,
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Feed the watchdog.  Must be called at least once per timeout.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the TWDT for the subscribed calling task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}
