fn main() {
    println!("cargo:rerun-if-env-changed=ENVNODE_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=ENVNODE_WIFI_PASS");
    println!("cargo:rerun-if-env-changed=ENVNODE_MQTT_URL");
    println!("cargo:rerun-if-env-changed=ENVNODE_DEVICE_ID");

    // Host builds have no ESP-IDF toolchain to describe.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
