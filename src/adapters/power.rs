//! Board power adapter: supply-rail measurement and timer deep sleep.
//!
//! The supply rail is read through a 1:2 resistor divider on an ADC1
//! channel with the oneshot driver.  Deep sleep arms the RTC timer and
//! calls `esp_deep_sleep_start()`; the chip comes back through a cold boot.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: raw `adc_oneshot_*` and `esp_sleep_*` sys calls.
//! On host/test: the ADC reads from a static `AtomicU16` for injection and
//! deep sleep only records the requested duration.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, AtomicU64, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::PowerPort;
use crate::error::{Error, Result};

const ADC_MAX: f32 = 4095.0;
/// Full-scale input at 12 dB attenuation.
const V_FULL_SCALE: f32 = 3.3;

#[cfg(not(target_os = "espidf"))]
static SIM_SUPPLY_ADC: AtomicU16 = AtomicU16::new(2048);
#[cfg(not(target_os = "espidf"))]
static SIM_LAST_SLEEP_US: AtomicU64 = AtomicU64::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_supply_adc(raw: u16) {
    SIM_SUPPLY_ADC.store(raw, Ordering::Relaxed);
}

/// Duration of the last simulated deep sleep, 0 if none.
#[cfg(not(target_os = "espidf"))]
pub fn sim_last_sleep_us() -> u64 {
    SIM_LAST_SLEEP_US.load(Ordering::Relaxed)
}

/// Convert a 12-bit ADC count behind a divider into rail volts.
/// Saturated or zero counts mean the channel is not wired.
pub fn adc_to_volts(raw: u16, divider_ratio: f32) -> Option<f32> {
    if raw == 0 || raw >= ADC_MAX as u16 {
        return None;
    }
    Some((raw as f32 / ADC_MAX) * V_FULL_SCALE * divider_ratio)
}

pub struct BoardPower {
    divider_ratio: f32,
    #[cfg(target_os = "espidf")]
    adc: adc_oneshot_unit_handle_t,
    #[cfg(target_os = "espidf")]
    channel: adc_channel_t,
}

impl BoardPower {
    /// Configure ADC1 `channel` for supply monitoring.
    #[cfg(target_os = "espidf")]
    pub fn new(channel: adc_channel_t, divider_ratio: f32) -> Result<Self> {
        let mut adc: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        // SAFETY: called once from main before the loop starts; the handle
        // is owned by this adapter from here on.
        let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut adc) };
        if ret != ESP_OK as i32 {
            return Err(Error::Init("ADC1 unit init failed"));
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: `adc` was just created above.
        let ret = unsafe { adc_oneshot_config_channel(adc, channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(Error::Init("ADC1 channel config failed"));
        }

        info!("power: supply monitor on ADC1 channel {}", channel);
        Ok(Self {
            divider_ratio,
            adc,
            channel,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(_channel: u32, divider_ratio: f32) -> Result<Self> {
        if !(divider_ratio.is_finite() && divider_ratio > 0.0) {
            return Err(Error::Init("supply divider ratio must be positive"));
        }
        info!("power(sim): supply monitor on simulated ADC");
        Ok(Self { divider_ratio })
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&mut self) -> u16 {
        let mut raw: i32 = 0;
        // SAFETY: handle and channel were configured in `new`; main-loop
        // access only.
        let ret = unsafe { adc_oneshot_read(self.adc, self.channel, &mut raw) };
        if ret != ESP_OK as i32 {
            warn!("power: ADC read failed ({})", ret);
            return 0;
        }
        raw.max(0) as u16
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&mut self) -> u16 {
        SIM_SUPPLY_ADC.load(Ordering::Relaxed)
    }
}

impl PowerPort for BoardPower {
    fn battery_voltage(&mut self) -> Option<f32> {
        let raw = self.read_adc();
        adc_to_volts(raw, self.divider_ratio)
    }

    #[cfg(target_os = "espidf")]
    fn deep_sleep(&mut self, duration_us: u64) {
        info!("power: entering deep sleep for {}us", duration_us);
        // SAFETY: plain ESP-IDF sleep API calls; `esp_deep_sleep_start`
        // never returns.
        unsafe {
            if esp_sleep_enable_timer_wakeup(duration_us) != ESP_OK as i32 {
                warn!("power: timer wakeup rejected, sleeping anyway");
            }
            esp_deep_sleep_start();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn deep_sleep(&mut self, duration_us: u64) {
        info!("power(sim): deep sleep for {}us", duration_us);
        SIM_LAST_SLEEP_US.store(duration_us, Ordering::Relaxed);
    }
}
