//! Fuzz target: `PowerModeController` tick sequences
//!
//! Each input byte is one step: the low bits pick an operation (advance the
//! clock, flap the link, break the transport, acknowledge sleep) and every
//! step ends with a tick.
//!
//! Invariants checked:
//! - No panics under any step sequence
//! - A sleep-cycle boot samples at most once and deep-sleeps at most once
//! - Nothing is sampled while the sensor is missing
//!
//! cargo fuzz run fuzz_controller_ticks

#![no_main]

use std::cell::Cell;

use envnode::app::events::AppEvent;
use envnode::app::ports::{
    ClockPort, EventSink, MessagingPort, PowerPort, RawSample, SensorPort,
};
use envnode::error::{CommsError, SensorError};
use envnode::{NodeConfig, PowerModeController};
use libfuzzer_sys::fuzz_target;

struct Node {
    present: bool,
    connected: bool,
    broken: bool,
    reads: u32,
    sleeps: u32,
}

impl SensorPort for Node {
    fn init(&mut self) -> Result<(), SensorError> {
        if self.present { Ok(()) } else { Err(SensorError::NotFound) }
    }

    fn read_all(&mut self) -> RawSample {
        self.reads += 1;
        RawSample {
            temperature_c: Some(21.0),
            humidity_pct: None,
            pressure_hpa: Some(f32::NAN),
        }
    }
}

impl PowerPort for Node {
    fn battery_voltage(&mut self) -> Option<f32> {
        Some(3.1)
    }

    fn deep_sleep(&mut self, _duration_us: u64) {
        self.sleeps += 1;
    }
}

impl MessagingPort for Node {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish_property(&mut self, _: &str, _: &str, _: &str) -> Result<(), CommsError> {
        if self.connected && !self.broken {
            Ok(())
        } else {
            Err(CommsError::PublishFailed)
        }
    }

    fn request_prepare_to_sleep(&mut self) {}
}

struct Clock(Cell<u32>);

impl ClockPort for Clock {
    fn now_millis(&self) -> u32 {
        self.0.get()
    }
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let Some((&header, steps)) = data.split_first() else {
        return;
    };

    let config = match header % 3 {
        0 => NodeConfig::mains(),
        1 => NodeConfig::battery(),
        _ => NodeConfig::battery_minimal(),
    };
    let sleep_cycle = config.mode.is_sleep_cycle();
    let mut node = Node {
        present: header & 0x80 == 0,
        connected: false,
        broken: false,
        reads: 0,
        sleeps: 0,
    };
    let clock = Clock(Cell::new(u32::MAX - u32::from(header) * 1_000));
    let Ok(mut ctrl) = PowerModeController::new(config) else {
        return;
    };
    let _ = ctrl.start(&clock, &mut node, &mut Discard);

    for &step in steps {
        match step & 0x07 {
            0 => node.connected = !node.connected,
            1 => node.broken = !node.broken,
            2 => ctrl.notify_ready_to_sleep(),
            _ => {
                let advance = u32::from(step >> 3) * 250;
                clock.0.set(clock.0.get().wrapping_add(advance));
            }
        }
        ctrl.tick(&clock, &mut node, &mut Discard);

        if !node.present {
            assert_eq!(node.reads, 0, "sampled a missing sensor");
        }
        if sleep_cycle {
            assert!(node.reads <= 1, "sleep cycle sampled twice in one boot");
            assert!(node.sleeps <= 1, "deep sleep entered twice");
        }
    }
});
