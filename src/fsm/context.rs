//! Per-boot cycle state and the context threaded through every FSM handler.
//!
//! `CycleState` is owned by the controller and lives exactly as long as
//! the boot does.  `CycleContext` is rebuilt each tick; it lends the
//! handlers the configuration, the state, the hardware ports and the event
//! sink for the duration of that tick.

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, NodeHardware};
use crate::config::NodeConfig;
use crate::publisher::{PublishReport, Publisher};
use crate::sensors::{Reading, SensorSampler};
use crate::validation::Verdicts;

// ---------------------------------------------------------------------------
// Cycle state (owned by the controller, fresh at every boot)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CycleState {
    /// Continuous mode: timestamp of the last cycle that restarted the
    /// interval.  Starts at boot, so the first cycle is one interval in.
    pub last_cycle_ms: u32,
    /// Sleep-cycle mode: set once the single cycle of this boot has run.
    pub has_published_this_boot: bool,
    /// Mirror of the transport's connected flag, refreshed every tick.
    pub connection_ready: bool,
    /// `unit` properties have been sent on this boot.
    pub units_advertised: bool,

    /// Latched "ready to sleep" answer from the transport.
    pub ready_to_sleep: bool,
    /// When the prepare-to-sleep handshake started.
    pub prepare_sleep_at_ms: Option<u32>,
    /// Timestamp of the controller start, for wake-time diagnostics.
    pub boot_ms: u32,

    // -- Cycle in flight --
    pub reading: Option<Reading>,
    pub verdicts: Option<Verdicts>,
    pub report: Option<PublishReport>,

    // -- Counters --
    /// Sensor samples taken since boot.
    pub samples_taken: u32,
    /// Cycles run to completion since boot.
    pub cycles_completed: u32,
}

impl CycleState {
    pub fn new(boot_ms: u32) -> Self {
        Self {
            boot_ms,
            last_cycle_ms: boot_ms,
            ..Self::default()
        }
    }

    /// Drop the in-flight cycle data.
    pub fn clear_pending(&mut self) {
        self.reading = None;
        self.verdicts = None;
        self.report = None;
    }
}

// ---------------------------------------------------------------------------
// CycleContext
// ---------------------------------------------------------------------------

/// The context passed to every state handler function.
pub struct CycleContext<'a> {
    /// Clock reading taken once at the start of the tick.
    pub now_ms: u32,
    pub config: &'a NodeConfig,
    pub cycle: &'a mut CycleState,
    pub sampler: &'a SensorSampler,
    pub publisher: &'a Publisher,
    pub hw: &'a mut dyn NodeHardware,
    pub sink: &'a mut dyn EventSink,
}

impl CycleContext<'_> {
    /// Milliseconds since `since`, wraparound-safe.
    pub fn elapsed_since(&self, since: u32) -> u32 {
        self.now_ms.wrapping_sub(since)
    }

    pub fn emit(&mut self, event: &AppEvent) {
        self.sink.emit(event);
    }

    /// Emit only when per-cycle diagnostics are enabled.
    pub fn trace(&mut self, event: &AppEvent) {
        if self.config.diagnostics {
            self.sink.emit(event);
        }
    }
}
