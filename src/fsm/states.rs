//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers. The table holds no closures and no dynamic
//! dispatch, and nothing is heap allocated.
//!
//! ```text
//!  IDLE ──[cycle due]──▶ SAMPLING ──▶ VALIDATING ──▶ PUBLISHING
//!    ▲                                                   │
//!    │                                                   ▼
//!    └──────────[continuous]────────────────────── CYCLE_COMPLETE
//!    │                                                   │
//!    │                                             [sleep cycle]
//!    │                                                   ▼
//!    └──[sleep cycle, no link]──────────────────▶ PREPARING_SLEEP
//!                                                        │
//!        SLEEPING ◀──────────[ready to sleep | timeout]───┘
//!
//!  start() with missing sensor ──▶ HALTED (or PREPARING_SLEEP, per policy)
//! ```

use log::{debug, error, info, warn};

use super::context::CycleContext;
use super::{StateDescriptor, StateId};
use crate::app::events::{AppEvent, CycleReport};
use crate::config::{PowerMode, TimingPolicy};
use crate::error::SensorError;
use crate::validation::validate;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: None,
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: StateId::Sampling,
            name: "Sampling",
            on_enter: None,
            on_exit: None,
            on_update: sampling_update,
        },
        StateDescriptor {
            id: StateId::Validating,
            name: "Validating",
            on_enter: None,
            on_exit: None,
            on_update: validating_update,
        },
        StateDescriptor {
            id: StateId::Publishing,
            name: "Publishing",
            on_enter: None,
            on_exit: None,
            on_update: publishing_update,
        },
        StateDescriptor {
            id: StateId::CycleComplete,
            name: "CycleComplete",
            on_enter: None,
            on_exit: None,
            on_update: cycle_complete_update,
        },
        StateDescriptor {
            id: StateId::PreparingSleep,
            name: "PreparingSleep",
            on_enter: Some(preparing_sleep_enter),
            on_exit: None,
            on_update: preparing_sleep_update,
        },
        StateDescriptor {
            id: StateId::Sleeping,
            name: "Sleeping",
            on_enter: Some(sleeping_enter),
            on_exit: None,
            on_update: terminal_update,
        },
        StateDescriptor {
            id: StateId::Halted,
            name: "Halted",
            on_enter: Some(halted_enter),
            on_exit: None,
            on_update: terminal_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE: decide whether a cycle is due
// ═══════════════════════════════════════════════════════════════════════════

fn idle_update(ctx: &mut CycleContext<'_>) -> Option<StateId> {
    if ctx.cycle.connection_ready && !ctx.cycle.units_advertised {
        let report = ctx.publisher.advertise_units(&mut *ctx.hw);
        ctx.cycle.units_advertised = true;
        ctx.emit(&AppEvent::UnitsAdvertised(report));
    }

    let due = match ctx.config.mode {
        PowerMode::Continuous { .. } => {
            let interval_ms = ctx.config.mode.interval_ms().unwrap_or(0);
            ctx.elapsed_since(ctx.cycle.last_cycle_ms) >= interval_ms
        }
        // Sending before the link is up would lose the only reading of
        // this boot.
        PowerMode::SleepCycle { .. } => {
            if !ctx.cycle.connection_ready && !ctx.cycle.has_published_this_boot {
                let waited_ms = ctx.elapsed_since(ctx.cycle.boot_ms);
                if waited_ms >= ctx.config.connect_timeout_ms {
                    warn!("IDLE: no link after {}ms, giving up on this boot", waited_ms);
                    ctx.emit(&AppEvent::LinkTimedOut { waited_ms });
                    return Some(StateId::PreparingSleep);
                }
            }
            ctx.cycle.connection_ready && !ctx.cycle.has_published_this_boot
        }
    };

    due.then_some(StateId::Sampling)
}

// ═══════════════════════════════════════════════════════════════════════════
//  SAMPLING: exactly one sensor read
// ═══════════════════════════════════════════════════════════════════════════

fn sampling_update(ctx: &mut CycleContext<'_>) -> Option<StateId> {
    let reading = ctx.sampler.sample(&mut *ctx.hw);
    ctx.cycle.samples_taken = ctx.cycle.samples_taken.wrapping_add(1);
    if !reading.has_sensor_data() {
        warn!("SAMPLING: no channel came back from the sensor");
        ctx.emit(&AppEvent::SensorFault(SensorError::ReadFailed));
    }
    ctx.cycle.reading = Some(reading);
    ctx.trace(&AppEvent::Sampled(reading));
    Some(StateId::Validating)
}

// ═══════════════════════════════════════════════════════════════════════════
//  VALIDATING
// ═══════════════════════════════════════════════════════════════════════════

fn validating_update(ctx: &mut CycleContext<'_>) -> Option<StateId> {
    let Some(reading) = ctx.cycle.reading else {
        warn!("VALIDATING: no reading in flight, abandoning cycle");
        return Some(StateId::CycleComplete);
    };

    let verdicts = validate(&reading, ctx.config.validation, &ctx.config.bounds);
    if ctx.config.diagnostics {
        for (field, reason) in verdicts.rejected() {
            debug!("VALIDATING: dropped {:?} ({:?})", field, reason);
            ctx.sink.emit(&AppEvent::FieldRejected { field, reason });
        }
    }
    ctx.cycle.verdicts = Some(verdicts);
    Some(StateId::Publishing)
}

// ═══════════════════════════════════════════════════════════════════════════
//  PUBLISHING
// ═══════════════════════════════════════════════════════════════════════════

fn publishing_update(ctx: &mut CycleContext<'_>) -> Option<StateId> {
    if let Some(verdicts) = ctx.cycle.verdicts {
        let report = ctx.publisher.publish(&mut *ctx.hw, &verdicts);
        ctx.cycle.report = Some(report);
    }
    Some(StateId::CycleComplete)
}

// ═══════════════════════════════════════════════════════════════════════════
//  CYCLE_COMPLETE: feed the outcome back into timing / sleep state
// ═══════════════════════════════════════════════════════════════════════════

fn cycle_complete_update(ctx: &mut CycleContext<'_>) -> Option<StateId> {
    let sent = ctx.cycle.report.take().unwrap_or_default();
    let any_sent = sent.any_sent();
    if let (Some(reading), Some(verdicts)) = (ctx.cycle.reading, ctx.cycle.verdicts) {
        ctx.emit(&AppEvent::CycleCompleted(CycleReport {
            reading,
            verdicts,
            sent,
        }));
    }
    ctx.cycle.clear_pending();
    ctx.cycle.cycles_completed = ctx.cycle.cycles_completed.wrapping_add(1);

    match ctx.config.mode {
        PowerMode::Continuous { .. } => {
            let restart = match ctx.config.timing {
                TimingPolicy::PerField => any_sent,
                TimingPolicy::FixedInterval => true,
            };
            if restart {
                ctx.cycle.last_cycle_ms = ctx.now_ms;
            } else {
                debug!("CYCLE: nothing published, retrying next tick");
            }
            Some(StateId::Idle)
        }
        PowerMode::SleepCycle { .. } => {
            // Sleep even if nothing went out: spinning here drains the
            // battery for nothing.
            ctx.cycle.has_published_this_boot = true;
            Some(StateId::PreparingSleep)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PREPARING_SLEEP: let the transport flush before powering down
// ═══════════════════════════════════════════════════════════════════════════

fn preparing_sleep_enter(ctx: &mut CycleContext<'_>) {
    ctx.cycle.ready_to_sleep = false;
    ctx.cycle.prepare_sleep_at_ms = Some(ctx.now_ms);
    ctx.hw.request_prepare_to_sleep();
    ctx.emit(&AppEvent::SleepRequested);
    info!("PREPARING_SLEEP: waiting for transport to flush");
}

fn preparing_sleep_update(ctx: &mut CycleContext<'_>) -> Option<StateId> {
    if ctx.cycle.ready_to_sleep {
        let awake_ms = ctx.elapsed_since(ctx.cycle.boot_ms);
        if ctx.config.diagnostics {
            info!("SLEEP | ready after {:.2}s", awake_ms as f32 / 1000.0);
        }
        ctx.trace(&AppEvent::ReadyToSleep { awake_ms });
        return Some(StateId::Sleeping);
    }

    let started = ctx.cycle.prepare_sleep_at_ms.unwrap_or(ctx.now_ms);
    let waited_ms = ctx.elapsed_since(started);
    if waited_ms >= ctx.config.sleep_handshake_timeout_ms {
        warn!("PREPARING_SLEEP: no ready-to-sleep after {}ms, forcing sleep", waited_ms);
        ctx.emit(&AppEvent::SleepForced { waited_ms });
        return Some(StateId::Sleeping);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SLEEPING / HALTED: terminal for this boot
// ═══════════════════════════════════════════════════════════════════════════

fn sleeping_enter(ctx: &mut CycleContext<'_>) {
    let Some(duration_us) = ctx.config.mode.sleep_duration_us() else {
        error!("SLEEPING: entered without a sleep duration");
        return;
    };
    ctx.emit(&AppEvent::EnteringSleep { duration_us });
    info!("SLEEPING: deep sleep for {}s", duration_us / 1_000_000);
    ctx.hw.deep_sleep(duration_us);
}

fn halted_enter(ctx: &mut CycleContext<'_>) {
    error!("HALTED: sensor unavailable, no readings will be published this boot");
    ctx.emit(&AppEvent::Halted);
}

fn terminal_update(_ctx: &mut CycleContext<'_>) -> Option<StateId> {
    None
}
