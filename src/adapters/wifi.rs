//! WiFi station-mode bring-up.
//!
//! The node only needs a station link for the MQTT session, so this is a
//! blocking connect with bounded retries rather than a long-lived
//! connectivity service.  Credentials are baked in at build time
//! (`ENVNODE_WIFI_SSID` / `ENVNODE_WIFI_PASS`).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: only credential validation and the retry
//!   schedule, which are tested on the host.
//!
//! ## Retry policy
//!
//! Failed attempts wait an exponential backoff (2 s → 4 s → 8 s … capped
//! at 16 s).  A battery node gives up after [`CONNECT_ATTEMPTS`] and lets
//! the controller's sleep path run; a mains node keeps the MQTT client
//! retrying in the background.
//!
//! The whole retry sequence outlasts the task watchdog, so the caller
//! passes a `feed` hook that runs before every attempt and once per
//! [`FEED_SLICE_MS`] of backoff.

use core::fmt;

#[cfg(target_os = "espidf")]
use log::{info, warn};

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for WifiError {}

pub const CONNECT_ATTEMPTS: u32 = 5;
const MAX_BACKOFF_SECS: u32 = 16;
/// Longest stretch of backoff between two watchdog feeds.
pub const FEED_SLICE_MS: u32 = 1_000;

/// Delay before retry number `attempt` (1-based).
pub fn backoff_secs(attempt: u32) -> u32 {
    2u32.saturating_pow(attempt.max(1)).min(MAX_BACKOFF_SECS)
}

/// Wait out the backoff after `attempt`, in slices of at most
/// [`FEED_SLICE_MS`] with a `feed` after each one.
pub fn wait_backoff(attempt: u32, feed: &mut dyn FnMut(), sleep_ms: &mut dyn FnMut(u32)) {
    let mut remaining = backoff_secs(attempt).saturating_mul(1000);
    while remaining > 0 {
        let slice = remaining.min(FEED_SLICE_MS);
        sleep_ms(slice);
        feed();
        remaining -= slice;
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, WifiError> {
        if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
            return Err(WifiError::InvalidSsid);
        }
        if !password.is_empty() && (password.len() < 8 || password.len() > 64) {
            return Err(WifiError::InvalidPassword);
        }
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds
            .ssid
            .push_str(ssid)
            .map_err(|_| WifiError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| WifiError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials baked in at build time, if any.
    pub fn from_build_env() -> Result<Self, WifiError> {
        let ssid = option_env!("ENVNODE_WIFI_SSID").ok_or(WifiError::NoCredentials)?;
        Self::new(ssid, option_env!("ENVNODE_WIFI_PASS").unwrap_or(""))
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Station bring-up (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn connect_station(
    modem: esp_idf_svc::hal::modem::Modem,
    sys_loop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    creds: &WifiCredentials,
    feed: &mut dyn FnMut(),
) -> anyhow::Result<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>> {
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

    let esp_wifi = EspWifi::new(modem, sys_loop.clone(), nvs)?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

    let auth_method = if creds.is_open() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: creds
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| WifiError::InvalidSsid)?,
        password: creds
            .password
            .as_str()
            .try_into()
            .map_err(|_| WifiError::InvalidPassword)?,
        auth_method,
        ..Default::default()
    }))?;
    wifi.start()?;
    info!("WiFi: connecting to '{}'", creds.ssid());

    for attempt in 1..=CONNECT_ATTEMPTS {
        feed();
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => {
                info!("WiFi: connected on attempt {}", attempt);
                return Ok(wifi);
            }
            Err(e) => {
                warn!("WiFi: attempt {}/{} failed ({})", attempt, CONNECT_ATTEMPTS, e);
                let _ = wifi.disconnect();
                if attempt < CONNECT_ATTEMPTS {
                    wait_backoff(attempt, feed, &mut |ms| {
                        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
                    });
                }
            }
        }
    }
    Err(WifiError::ConnectionFailed.into())
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
