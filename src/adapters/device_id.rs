//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable Homie device id in the form `envnode-xxyyzz` (last 3
//! bytes of the 6-byte MAC in lowercase hex).  Homie ids must be lowercase
//! `[a-z0-9-]`, which this format satisfies.  Used when no id is baked in
//! at build time.

/// Fixed-size device ID string, sized to fit `NodeConfig::device_id`.
pub type DeviceIdString = heapless::String<32>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly 6 bytes into a 6-byte buffer.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the Homie device id from the last 3 MAC bytes.
pub fn device_id(prefix: &str, mac: &MacAddress) -> DeviceIdString {
    use core::fmt::Write;
    let mut id = DeviceIdString::new();
    let _ = write!(id, "{}-{:02x}{:02x}{:02x}", prefix, mac[3], mac[4], mac[5]);
    id
}

/// `true` if `id` is a legal Homie topic id.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('-')
        && id
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
