//! Power-mode controller, the hexagonal core.
//!
//! [`PowerModeController`] owns the configuration, the per-boot
//! [`CycleState`] and the FSM.  The main loop calls [`tick`] once per
//! iteration; everything the controller needs from the outside world is
//! handed in through port traits at the call site.
//!
//! ```text
//!  ClockPort ───▶ ┌──────────────────────────────┐
//!  SensorPort ──▶ │     PowerModeController      │ ──▶ EventSink
//!  PowerPort ◀──▶ │  FSM · Sampler · Publisher   │
//! MessagingPort ◀─└──────────────────────────────┘
//! ```
//!
//! [`tick`]: PowerModeController::tick

use log::{error, info, warn};

use crate::config::{InitFailurePolicy, NodeConfig, PowerMode};
use crate::error::{Error, Result};
use crate::fsm::context::{CycleContext, CycleState};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::publisher::Publisher;
use crate::sensors::SensorSampler;

use super::events::AppEvent;
use super::ports::{ClockPort, EventSink, NodeHardware};

pub struct PowerModeController {
    config: NodeConfig,
    fsm: Fsm,
    cycle: CycleState,
    sampler: SensorSampler,
    publisher: Publisher,
    started: bool,
}

impl PowerModeController {
    /// Validate `config` and build a controller with fresh boot state.
    ///
    /// Does **not** touch hardware. Call [`start`](Self::start) next.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let sampler = SensorSampler::new(config.pressure_offset_hpa, config.diagnostics);
        let publisher = Publisher::new(config.naming.clone());
        Ok(Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            cycle: CycleState::default(),
            sampler,
            publisher,
            config,
            started: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Probe the sensor and enter normal operation.
    ///
    /// A missing sensor is fatal for the boot: the error is returned and
    /// the controller never samples.  Continuous nodes halt; sleep-cycle
    /// nodes follow [`InitFailurePolicy`].
    pub fn start(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut impl NodeHardware,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let now_ms = clock.now_millis();
        self.cycle = CycleState::new(now_ms);
        self.started = true;

        let init = self.sampler.init(hw);
        let mut ctx = CycleContext {
            now_ms,
            config: &self.config,
            cycle: &mut self.cycle,
            sampler: &self.sampler,
            publisher: &self.publisher,
            hw,
            sink,
        };
        self.fsm.start(&mut ctx);

        match init {
            Ok(()) => {
                ctx.emit(&AppEvent::Started {
                    mode: self.config.mode,
                });
                info!(
                    "{} v{} started ({:?})",
                    self.config.firmware.name, self.config.firmware.version, self.config.mode
                );
                Ok(())
            }
            Err(e) => {
                error!("Sensor init failed: {}", e);
                if let Error::Sensor(se) = e {
                    ctx.emit(&AppEvent::SensorFault(se));
                }
                let target = match (self.config.mode, self.config.init_failure) {
                    (PowerMode::SleepCycle { .. }, InitFailurePolicy::SleepAndRetry) => {
                        warn!("Sleeping until next boot to retry the sensor");
                        StateId::PreparingSleep
                    }
                    _ => StateId::Halted,
                };
                self.fsm.force_transition(target, &mut ctx);
                Err(e)
            }
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one scheduler iteration and return the state the controller
    /// settled in.  At most one full cycle runs per call.
    pub fn tick(
        &mut self,
        clock: &impl ClockPort,
        hw: &mut impl NodeHardware,
        sink: &mut impl EventSink,
    ) -> StateId {
        if !self.started {
            warn!("tick() before start(), ignoring");
            return self.fsm.current_state();
        }
        if self.fsm.current_state().is_terminal() {
            return self.fsm.current_state();
        }

        self.cycle.connection_ready = hw.is_connected();

        let mut ctx = CycleContext {
            now_ms: clock.now_millis(),
            config: &self.config,
            cycle: &mut self.cycle,
            sampler: &self.sampler,
            publisher: &self.publisher,
            hw,
            sink,
        };
        self.fsm.tick(&mut ctx)
    }

    /// Transport callback: the session is flushed and it is safe to cut
    /// power.  Takes effect on the next [`tick`](Self::tick).
    pub fn notify_ready_to_sleep(&mut self) {
        self.cycle.ready_to_sleep = true;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn is_terminal(&self) -> bool {
        self.fsm.current_state().is_terminal()
    }

    pub fn cycle_state(&self) -> &CycleState {
        &self.cycle
    }

    /// Cycles run to completion since boot.
    pub fn cycles_run(&self) -> u32 {
        self.cycle.cycles_completed
    }

    /// Scheduler ticks processed since boot.
    pub fn tick_count(&self) -> u64 {
        self.fsm.tick_count()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
