//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌────────────────┬───────────┬──────────┬──────────────────┐ │
//! │  │ StateId        │ on_enter  │ on_exit  │ on_update        │ │
//! │  ├────────────────┼───────────┼──────────┼──────────────────┤ │
//! │  │ Idle           │ -         │ -        │ fn(ctx)->Option  │ │
//! │  │ Sampling       │ -         │ -        │ fn(ctx)->Option  │ │
//! │  │ Validating     │ -         │ -        │ fn(ctx)->Option  │ │
//! │  │ Publishing     │ -         │ -        │ fn(ctx)->Option  │ │
//! │  │ CycleComplete  │ -         │ -        │ fn(ctx)->Option  │ │
//! │  │ PreparingSleep │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  │ Sleeping       │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  │ Halted         │ fn(ctx)   │ -        │ fn(ctx)->Option  │ │
//! │  └────────────────┴───────────┴──────────┴──────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike a one-step-per-tick engine, [`Fsm::tick`] keeps calling
//! `on_update` while handlers return a next state, so a whole
//! Sampling → Validating → Publishing chain runs inside one scheduler
//! tick.  It stops when a handler returns `None` or when the chain comes
//! back to the state the tick started in, which caps a tick at one cycle.

pub mod context;
pub mod states;

use context::CycleContext;
use log::debug;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all controller states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Sampling = 1,
    Validating = 2,
    Publishing = 3,
    CycleComplete = 4,
    PreparingSleep = 5,
    Sleeping = 6,
    Halted = 7,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 8;

    /// Convert an index back to `StateId`.  Out-of-range indices map to
    /// `Halted` (asserts in debug builds).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Sampling,
            2 => Self::Validating,
            3 => Self::Publishing,
            4 => Self::CycleComplete,
            5 => Self::PreparingSleep,
            6 => Self::Sleeping,
            7 => Self::Halted,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Halted
            }
        }
    }

    /// States the device never leaves within the current boot.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sleeping | Self::Halted)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut CycleContext<'_>);

/// Signature for the update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut CycleContext<'_>) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    tick_count: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(table.iter().enumerate().all(|(i, d)| d.id as usize == i));
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut CycleContext<'_>) {
        debug!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM for one scheduler tick and return the state it
    /// settled in.
    pub fn tick(&mut self, ctx: &mut CycleContext<'_>) -> StateId {
        self.tick_count += 1;
        let origin = self.current;

        // A full chain visits each state at most once.
        for _ in 0..StateId::COUNT {
            let Some(next) = (self.table[self.current].on_update)(ctx) else {
                break;
            };
            if next as usize == self.current {
                break;
            }
            self.transition(next, ctx);
            if self.current == origin {
                break;
            }
        }
        self.current_state()
    }

    /// Jump straight to `next`, running exit/enter actions.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut CycleContext<'_>) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut CycleContext<'_>) {
        let next_idx = next_id as usize;

        debug!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
