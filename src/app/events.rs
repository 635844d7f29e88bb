//! Outbound application events.
//!
//! The [`PowerModeController`](super::controller::PowerModeController)
//! emits these through the [`EventSink`](super::ports::EventSink) port.
//! Per-sample and per-field events are only produced when diagnostics are
//! enabled in the configuration.

use crate::config::PowerMode;
use crate::error::SensorError;
use crate::publisher::PublishReport;
use crate::sensors::{Field, Reading};
use crate::validation::{Rejection, Verdicts};

/// Outcome of one Sampling → Validating → Publishing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub reading: Reading,
    pub verdicts: Verdicts,
    pub sent: PublishReport,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller passed sensor init and is running.
    Started { mode: PowerMode },

    /// Static `unit` properties were sent after the link came up.
    UnitsAdvertised(PublishReport),

    /// A fresh sample (diagnostics only).
    Sampled(Reading),

    /// A field was dropped from this cycle (diagnostics only).
    FieldRejected { field: Field, reason: Rejection },

    /// A cycle ran to completion.
    CycleCompleted(CycleReport),

    /// Prepare-to-sleep handshake started.
    SleepRequested,

    /// The transport confirmed it is ready (diagnostics only).
    ReadyToSleep { awake_ms: u32 },

    /// The handshake timed out and sleep is being forced.
    SleepForced { waited_ms: u32 },

    /// Deep sleep is about to be entered.
    EnteringSleep { duration_us: u64 },

    /// Sensor init failed at boot, or a sample came back with no channel.
    SensorFault(SensorError),

    /// A sleep-cycle boot gave up waiting for the link.
    LinkTimedOut { waited_ms: u32 },

    /// The controller stopped for good in this boot.
    Halted,
}
