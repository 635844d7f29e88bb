//! EnvNode firmware: main entry point.
//!
//! Hexagonal architecture around a single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Bme280Sensor   BoardPower    MqttMessaging   Esp32Clock       │
//! │  (SensorPort)   (PowerPort)   (MessagingPort) (ClockPort)      │
//! │           └──── HardwareAdapter ────┘         LogEventSink     │
//! │                                               (EventSink)      │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          PowerModeController (pure logic)              │    │
//! │  │  FSM · Sampler · Validator · Publisher                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::FromValueType;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use envnode::adapters::bme280::{Bme280Sensor, PRIMARY_ADDRESS};
use envnode::adapters::device_id;
use envnode::adapters::hardware::HardwareAdapter;
use envnode::adapters::log_sink::LogEventSink;
use envnode::adapters::mqtt::MqttMessaging;
use envnode::adapters::power::BoardPower;
use envnode::adapters::time::Esp32Clock;
use envnode::adapters::uplink::{OfflineUplink, Uplink};
use envnode::adapters::wifi::{self, WifiCredentials};
use envnode::app::ports::SensorPort;
use envnode::drivers::watchdog::TaskWatchdog;
use envnode::fsm::StateId;
use envnode::{NodeConfig, PowerModeController};

/// Main loop period.  Short enough to catch the ready-to-sleep ack
/// promptly, long enough to leave the MQTT task room to run.
const TICK_MS: u32 = 50;
/// Supply rail sits behind a 100k/100k divider on ADC1 channel 7 (GPIO35).
const SUPPLY_DIVIDER_RATIO: f32 = 2.0;
const DEFAULT_MQTT_URL: &str = "mqtt://192.168.1.10:1883";

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    // ── 2. Configuration ──────────────────────────────────────
    let mut config = if cfg!(feature = "battery") {
        NodeConfig::battery()
    } else {
        NodeConfig::mains()
    };
    let mac_id = device_id::device_id("envnode", &device_id::read_mac());
    config.device_id = match option_env!("ENVNODE_DEVICE_ID") {
        Some(id) if device_id::is_valid_id(id) => id.try_into().unwrap_or_else(|_| {
            warn!("ENVNODE_DEVICE_ID longer than 32 bytes, using {}", mac_id);
            mac_id.clone()
        }),
        Some(id) => {
            warn!("ENVNODE_DEVICE_ID '{}' is not a valid Homie id, using {}", id, mac_id);
            mac_id
        }
        None => mac_id,
    };
    if !config.diagnostics {
        log::set_max_level(log::LevelFilter::Warn);
    }

    info!("╔══════════════════════════════════════╗");
    info!("║  {} v{}", config.firmware.name, config.firmware.version);
    info!("║  device {}", config.device_id);
    info!("╚══════════════════════════════════════╝");

    let watchdog = TaskWatchdog::default();

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(100.kHz().into()),
    )?;
    let sensor = Bme280Sensor::new(i2c, PRIMARY_ADDRESS, Ets);
    let power = BoardPower::new(
        esp_idf_svc::sys::adc_channel_t_ADC_CHANNEL_7,
        SUPPLY_DIVIDER_RATIO,
    )?;

    // ── 4. Network ────────────────────────────────────────────
    // Nothing here may stop the boot: the controller still runs offline
    // and a battery node goes back to sleep once the link wait expires.
    let mut feed = || watchdog.feed();
    let wifi = match WifiCredentials::from_build_env() {
        Ok(creds) => {
            match wifi::connect_station(peripherals.modem, sys_loop, Some(nvs), &creds, &mut feed) {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!("WiFi unavailable ({:#}), continuing offline", e);
                    None
                }
            }
        }
        Err(e) => {
            warn!("WiFi not configured ({}), continuing offline", e);
            None
        }
    };
    watchdog.feed();

    let url = option_env!("ENVNODE_MQTT_URL").unwrap_or(DEFAULT_MQTT_URL);
    let mqtt = if wifi.is_some() {
        MqttMessaging::connect(url, &config)
            .inspect_err(|e| warn!("MQTT client unavailable ({}), continuing offline", e))
            .ok()
    } else {
        None
    };

    // ── 5. Controller ─────────────────────────────────────────
    let _wifi = wifi;
    match mqtt {
        Some(messaging) => run(config, HardwareAdapter::new(sensor, power, messaging), &watchdog),
        None => run(config, HardwareAdapter::new(sensor, power, OfflineUplink::new()), &watchdog),
    }
}

fn run<S, M>(
    config: NodeConfig,
    mut hw: HardwareAdapter<S, BoardPower, M>,
    watchdog: &TaskWatchdog,
) -> Result<()>
where
    S: SensorPort,
    M: Uplink,
{
    let clock = Esp32Clock::new();
    let mut sink = LogEventSink::new();

    let mut controller = PowerModeController::new(config)?;
    if let Err(e) = controller.start(&clock, &mut hw, &mut sink) {
        error!("Startup failed: {}", e);
    }

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        watchdog.feed();

        hw.messaging_mut().poll();
        if hw.messaging().take_ready_to_sleep() {
            controller.notify_ready_to_sleep();
        }

        let state = controller.tick(&clock, &mut hw, &mut sink);
        if state == StateId::Halted {
            // Stay observable on the console; a reset is the only way out.
            FreeRtos::delay_ms(1000);
            continue;
        }

        FreeRtos::delay_ms(TICK_MS);
    }
}
