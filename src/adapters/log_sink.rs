//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production, stderr on host).
//! Every line starts with a short tag so the serial stream can be grepped.

use core::fmt;

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::sensors::{Field, Reading};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// `t=22.5C h=55.0% p=1000.0hPa v=3.3V`, with `-` for missing fields.
struct ReadingLine<'a>(&'a Reading);

impl fmt::Display for ReadingLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in Field::ALL.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let tag = match field {
                Field::Temperature => "t",
                Field::Humidity => "h",
                Field::Pressure => "p",
                Field::SupplyVoltage => "v",
            };
            match self.0.get(*field) {
                Some(v) => write!(f, "{}={:.1}{}", tag, v, field.unit())?,
                None => write!(f, "{}=-", tag)?,
            }
        }
        Ok(())
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { mode } => {
                info!("START | mode={:?}", mode);
            }
            AppEvent::UnitsAdvertised(report) => {
                info!("START | units advertised ({}/{})", report.len(), Field::COUNT);
            }
            AppEvent::Sampled(reading) => {
                info!("READ  | {}", ReadingLine(reading));
            }
            AppEvent::FieldRejected { field, reason } => {
                info!("READ  | dropped {} ({:?})", field.node_id(), reason);
            }
            AppEvent::CycleCompleted(report) => {
                info!(
                    "CYCLE | {} | accepted={} sent={}",
                    ReadingLine(&report.reading),
                    report.verdicts.accepted_count(),
                    report.sent.len(),
                );
            }
            AppEvent::SleepRequested => {
                info!("SLEEP | prepare requested");
            }
            AppEvent::ReadyToSleep { awake_ms } => {
                info!("SLEEP | ready after {:.2}s", *awake_ms as f32 / 1000.0);
            }
            AppEvent::SleepForced { waited_ms } => {
                warn!("SLEEP | forced after {}ms without transport ack", waited_ms);
            }
            AppEvent::EnteringSleep { duration_us } => {
                info!("SLEEP | deep sleep {}s", duration_us / 1_000_000);
            }
            AppEvent::SensorFault(e) => {
                error!("FAULT | {}", e);
            }
            AppEvent::LinkTimedOut { waited_ms } => {
                warn!("SLEEP | no link after {}ms, sleeping without a reading", waited_ms);
            }
            AppEvent::Halted => {
                error!("STATE | halted");
            }
        }
    }
}
