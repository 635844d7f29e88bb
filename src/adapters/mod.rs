//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements     | Connects to                  |
//! |-------------|----------------|------------------------------|
//! | `bme280`    | SensorPort     | BME280 on I2C                |
//! | `hardware`  | NodeHardware   | sensor + power + messaging   |
//! | `log_sink`  | EventSink      | Serial log output            |
//! | `mqtt`      | MessagingPort  | ESP-IDF MQTT client (Homie)  |
//! | `power`     | PowerPort      | ESP32 ADC, RTC deep sleep    |
//! | `time`      | ClockPort      | ESP32 system timer           |
//! | `uplink`    | Uplink         | offline stand-in transport   |
//!
//! `homie`, `device_id` and `wifi` are helpers shared by the adapters and
//! `main`.

#[cfg(feature = "espidf")]
pub mod bme280;
pub mod device_id;
pub mod hardware;
pub mod homie;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod power;
pub mod time;
pub mod uplink;
pub mod wifi;
