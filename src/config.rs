//! Node configuration parameters
//!
//! Every behavioural difference between deployments (mains vs battery,
//! range vs all-or-nothing validation, naming scheme, diagnostics) lives
//! here.  The configuration is fixed at boot and never changes at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::publisher::PropertyNaming;
use crate::validation::{Bounds, ValidationPolicy};

/// Ten minutes of deep sleep.
pub const DEFAULT_SLEEP_US: u64 = 10 * 60 * 1_000_000;
/// Republish once a minute on mains power.
pub const DEFAULT_INTERVAL_SECS: u32 = 60;
/// A sleep-cycle boot waits this long for WiFi and the broker.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u32 = 30_000;
/// BME280 on this board reads low by about 16 hPa.
pub const DEFAULT_PRESSURE_OFFSET_HPA: f32 = 16.0;

/// Power regime, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerMode {
    /// Stay awake and republish every `interval_secs`.
    Continuous { interval_secs: u32 },
    /// Publish once per boot, then deep-sleep for `sleep_duration_us`.
    SleepCycle { sleep_duration_us: u64 },
}

impl PowerMode {
    pub fn interval_ms(&self) -> Option<u32> {
        match self {
            Self::Continuous { interval_secs } => Some(interval_secs.saturating_mul(1000)),
            Self::SleepCycle { .. } => None,
        }
    }

    pub fn sleep_duration_us(&self) -> Option<u64> {
        match self {
            Self::Continuous { .. } => None,
            Self::SleepCycle { sleep_duration_us } => Some(*sleep_duration_us),
        }
    }

    pub fn is_sleep_cycle(&self) -> bool {
        matches!(self, Self::SleepCycle { .. })
    }
}

/// When the continuous-mode interval timer restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingPolicy {
    /// Restart only if at least one field was published; otherwise retry
    /// on the very next tick.
    PerField,
    /// Restart on every cycle, published or not.
    FixedInterval,
}

/// What a sleep-cycle node does when the sensor is missing at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitFailurePolicy {
    /// Go back to sleep and try again on the next boot.
    SleepAndRetry,
    /// Stay halted until reset.
    Halt,
}

/// Name and version reported in the boot banner and the Homie `$fw/*`
/// attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    pub name: heapless::String<32>,
    pub version: heapless::String<16>,
}

impl FirmwareInfo {
    fn new(name: &str) -> Self {
        Self {
            name: bounded(name),
            version: bounded(env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub firmware: FirmwareInfo,
    /// Homie device id (`homie/<device_id>/...`).
    pub device_id: heapless::String<32>,

    // --- Power ---
    pub mode: PowerMode,
    /// Continuous mode only.
    pub timing: TimingPolicy,
    /// Sleep-cycle mode only.
    pub init_failure: InitFailurePolicy,
    /// Upper bound on the prepare-to-sleep handshake (milliseconds).
    pub sleep_handshake_timeout_ms: u32,
    /// Sleep-cycle mode: how long a boot waits for the link before going
    /// back to sleep without sampling (milliseconds).
    pub connect_timeout_ms: u32,

    // --- Readings ---
    pub validation: ValidationPolicy,
    /// Added to every pressure reading (hPa) before validation.
    pub pressure_offset_hpa: f32,
    pub bounds: Bounds,

    // --- Publishing ---
    pub naming: PropertyNaming,

    /// Per-cycle diagnostic output.  Costs wake time on battery nodes.
    pub diagnostics: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::mains()
    }
}

impl NodeConfig {
    /// Mains-powered node: republish every minute.
    pub fn mains() -> Self {
        Self {
            firmware: FirmwareInfo::new("envnode"),
            device_id: bounded("envnode"),
            mode: PowerMode::Continuous {
                interval_secs: DEFAULT_INTERVAL_SECS,
            },
            timing: TimingPolicy::FixedInterval,
            init_failure: InitFailurePolicy::Halt,
            sleep_handshake_timeout_ms: 3_000,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            validation: ValidationPolicy::Range,
            pressure_offset_hpa: DEFAULT_PRESSURE_OFFSET_HPA,
            bounds: Bounds::default(),
            naming: PropertyNaming::value(),
            diagnostics: true,
        }
    }

    /// Battery node: one reading per boot, ten minutes of deep sleep.
    pub fn battery() -> Self {
        Self {
            firmware: FirmwareInfo::new("envnode-battery"),
            mode: PowerMode::SleepCycle {
                sleep_duration_us: DEFAULT_SLEEP_US,
            },
            init_failure: InitFailurePolicy::SleepAndRetry,
            ..Self::mains()
        }
    }

    /// Leanest battery node: all-or-nothing validation, no diagnostics.
    pub fn battery_minimal() -> Self {
        Self {
            validation: ValidationPolicy::AllOrNothing,
            naming: PropertyNaming::descriptive(),
            diagnostics: false,
            ..Self::battery()
        }
    }

    /// Reject configurations the controller cannot run safely.
    pub fn validate(&self) -> Result<()> {
        match self.mode {
            PowerMode::Continuous { interval_secs: 0 } => {
                return Err(Error::Config("publish interval must be non-zero"));
            }
            PowerMode::SleepCycle {
                sleep_duration_us: 0,
            } => return Err(Error::Config("sleep duration must be non-zero")),
            _ => {}
        }
        if !self.pressure_offset_hpa.is_finite() {
            return Err(Error::Config("pressure offset must be finite"));
        }
        let b = &self.bounds;
        if !(b.temperature_c.is_well_formed()
            && b.humidity_pct.is_well_formed()
            && b.pressure_hpa.is_well_formed())
        {
            return Err(Error::Config("validation range min must be below max"));
        }
        if !self.naming.is_well_formed() {
            return Err(Error::Config("property names must be non-empty and not 'unit'"));
        }
        if self.device_id.is_empty() || self.device_id.contains('/') {
            return Err(Error::Config("device id must be a single topic level"));
        }
        if self.mode.is_sleep_cycle() && self.sleep_handshake_timeout_ms == 0 {
            return Err(Error::Config("sleep handshake timeout must be non-zero"));
        }
        if self.mode.is_sleep_cycle() && self.connect_timeout_ms == 0 {
            return Err(Error::Config("connect timeout must be non-zero"));
        }
        Ok(())
    }
}

fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
