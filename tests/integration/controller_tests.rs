//! Integration tests for the PowerModeController → FSM → ports pipeline.
//!
//! These run on the host (x86_64) and drive full boots against the mock
//! adapters: sampling, validation, publishing, the interval timer and the
//! deep-sleep handshake.

use crate::mock_hw::{MockClock, MockNode, RecordingSink};

use envnode::app::events::AppEvent;
use envnode::config::{InitFailurePolicy, NodeConfig, PowerMode, TimingPolicy};
use envnode::error::{Error, SensorError};
use envnode::fsm::StateId;
use envnode::sensors::Field;
use envnode::validation::Rejection;
use envnode::PowerModeController;

fn started(config: NodeConfig, hw: &mut MockNode) -> (PowerModeController, MockClock, RecordingSink) {
    let clock = MockClock::at(0);
    let mut sink = RecordingSink::new();
    let mut ctrl = PowerModeController::new(config).unwrap();
    ctrl.start(&clock, hw, &mut sink).unwrap();
    (ctrl, clock, sink)
}

/// Mains preset interval.
const INTERVAL_MS: u32 = 60_000;

/// Tick once the first continuous interval after boot has elapsed.
fn tick_first_cycle(
    ctrl: &mut PowerModeController,
    clock: &MockClock,
    hw: &mut MockNode,
    sink: &mut RecordingSink,
) -> StateId {
    clock.advance(INTERVAL_MS);
    ctrl.tick(clock, hw, sink)
}

// ── Scenario A: nominal continuous cycle ─────────────────────

#[test]
fn nominal_reading_publishes_all_four_values() {
    let mut hw = MockNode::new().with_sample(Some(22.5), Some(55.0), Some(984.0), Some(3.3));
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    let state = tick_first_cycle(&mut ctrl, &clock, &mut hw, &mut sink);

    assert_eq!(state, StateId::Idle, "a continuous cycle ends back in Idle");
    assert_eq!(hw.reads, 1);
    assert_eq!(
        hw.values(),
        vec![
            ("temperature", "value", "22.5"),
            ("humidity", "value", "55.0"),
            ("pressure", "value", "1000.0"),
            ("battery", "value", "3.3"),
        ]
    );
    assert_eq!(ctrl.cycles_run(), 1);
}

// ── Scenario B: out-of-range and missing fields ──────────────

#[test]
fn out_of_range_and_missing_fields_are_dropped() {
    let mut hw = MockNode::new().with_sample(Some(50.0), Some(55.0), Some(984.0), None);
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    tick_first_cycle(&mut ctrl, &clock, &mut hw, &mut sink);

    assert_eq!(
        hw.values(),
        vec![("humidity", "value", "55.0"), ("pressure", "value", "1000.0")]
    );
    let rejected: Vec<(Field, Rejection)> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::FieldRejected { field, reason } => Some((*field, *reason)),
            _ => None,
        })
        .collect();
    assert_eq!(
        rejected,
        vec![
            (Field::Temperature, Rejection::OutOfRange),
            (Field::SupplyVoltage, Rejection::Unavailable),
        ]
    );
}

#[test]
fn pressure_offset_applies_before_range_check() {
    // 930 hPa raw is below the 940 floor; +16 brings it inside.
    let mut hw = MockNode::new().with_sample(None, None, Some(930.0), None);
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    tick_first_cycle(&mut ctrl, &clock, &mut hw, &mut sink);

    assert_eq!(hw.values(), vec![("pressure", "value", "946.0")]);
}

// ── Scenario C: sleep cycle waits for the link ───────────────

#[test]
fn sleep_cycle_waits_for_connection_then_sleeps_once() {
    let mut hw = MockNode::new();
    hw.connected = false;
    let (mut ctrl, clock, mut sink) = started(NodeConfig::battery(), &mut hw);

    for _ in 0..3 {
        clock.advance(100);
        assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::Idle);
    }
    assert_eq!(hw.reads, 0, "no sampling before the link is up");
    assert!(hw.published.is_empty());

    hw.connected = true;
    clock.advance(100);
    let state = ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(state, StateId::PreparingSleep);
    assert_eq!(hw.reads, 1);
    assert_eq!(hw.values().len(), 4);
    assert_eq!(hw.prepare_requests, 1);
    assert!(hw.sleeps.is_empty(), "sleep waits for the transport");
    assert!(ctrl.cycle_state().has_published_this_boot);

    ctrl.notify_ready_to_sleep();
    clock.advance(100);
    assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::Sleeping);
    assert_eq!(hw.sleeps, vec![600_000_000]);

    for _ in 0..5 {
        clock.advance(100);
        ctrl.tick(&clock, &mut hw, &mut sink);
    }
    assert_eq!(hw.sleeps.len(), 1, "deep sleep entered exactly once");
    assert_eq!(hw.reads, 1);
    assert_eq!(ctrl.cycles_run(), 1);
    assert!(ctrl.is_terminal());
}

#[test]
fn sleep_cycle_sleeps_even_when_nothing_was_sent() {
    let mut hw = MockNode::new();
    hw.fail_publish = true;
    let (mut ctrl, clock, mut sink) = started(NodeConfig::battery(), &mut hw);

    assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::PreparingSleep);
    assert!(hw.published.is_empty());

    ctrl.notify_ready_to_sleep();
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.sleeps.len(), 1);
}

#[test]
fn ready_to_sleep_is_logged_with_awake_time() {
    let mut hw = MockNode::new();
    let (mut ctrl, clock, mut sink) = started(NodeConfig::battery(), &mut hw);

    ctrl.tick(&clock, &mut hw, &mut sink);
    clock.advance(3_840);
    ctrl.notify_ready_to_sleep();
    ctrl.tick(&clock, &mut hw, &mut sink);

    assert!(sink.events.contains(&AppEvent::ReadyToSleep { awake_ms: 3_840 }));
    assert!(sink.events.contains(&AppEvent::EnteringSleep {
        duration_us: 600_000_000
    }));
}

#[test]
fn sleep_cycle_without_link_gives_up_and_sleeps() {
    let mut hw = MockNode::new();
    hw.connected = false;
    let (mut ctrl, clock, mut sink) = started(NodeConfig::battery(), &mut hw);

    clock.advance(29_999);
    assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::Idle);
    assert_eq!(hw.prepare_requests, 0);

    clock.advance(1);
    assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::PreparingSleep);
    assert!(sink.events.contains(&AppEvent::LinkTimedOut { waited_ms: 30_000 }));
    assert_eq!(hw.prepare_requests, 1);

    // An offline transport has nothing to flush.
    ctrl.notify_ready_to_sleep();
    clock.advance(50);
    assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::Sleeping);
    assert_eq!(hw.sleeps, vec![600_000_000]);
    assert_eq!(hw.reads, 0, "no reading is taken without a link");
    assert!(hw.published.is_empty());
}

#[test]
fn empty_sample_reports_a_read_failure() {
    let mut hw = MockNode::new().with_sample(None, None, None, Some(3.3));
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    tick_first_cycle(&mut ctrl, &clock, &mut hw, &mut sink);

    assert!(sink.events.contains(&AppEvent::SensorFault(SensorError::ReadFailed)));
    assert_eq!(hw.values(), vec![("battery", "value", "3.3")]);
}

// ── Sleep handshake timeout ──────────────────────────────────

#[test]
fn handshake_timeout_forces_exactly_one_sleep() {
    let mut hw = MockNode::new();
    let (mut ctrl, clock, mut sink) = started(NodeConfig::battery(), &mut hw);

    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(ctrl.state(), StateId::PreparingSleep);

    clock.advance(2_999);
    assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::PreparingSleep);
    assert!(hw.sleeps.is_empty());

    clock.advance(1);
    assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::Sleeping);
    assert_eq!(hw.sleeps.len(), 1);

    clock.advance(10_000);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.sleeps.len(), 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SleepForced { .. })),
        1
    );
}

// ── Sensor init failure ──────────────────────────────────────

#[test]
fn continuous_node_halts_without_sensor() {
    let mut hw = MockNode::new();
    hw.sensor_present = false;
    let clock = MockClock::at(0);
    let mut sink = RecordingSink::new();
    let mut ctrl = PowerModeController::new(NodeConfig::mains()).unwrap();

    let err = ctrl.start(&clock, &mut hw, &mut sink).unwrap_err();
    assert_eq!(err, Error::Sensor(SensorError::NotFound));
    assert_eq!(ctrl.state(), StateId::Halted);

    for _ in 0..10 {
        clock.advance(60_000);
        assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::Halted);
    }
    assert_eq!(hw.reads, 0);
    assert!(hw.published.is_empty());
    assert!(hw.sleeps.is_empty());
    assert!(sink.events.contains(&AppEvent::SensorFault(SensorError::NotFound)));
    assert!(sink.events.contains(&AppEvent::Halted));
}

#[test]
fn sleep_cycle_node_retries_sensor_on_next_boot() {
    let mut hw = MockNode::new();
    hw.sensor_present = false;
    let clock = MockClock::at(0);
    let mut sink = RecordingSink::new();
    let mut ctrl = PowerModeController::new(NodeConfig::battery()).unwrap();

    assert!(ctrl.start(&clock, &mut hw, &mut sink).is_err());
    assert_eq!(ctrl.state(), StateId::PreparingSleep);
    assert_eq!(hw.prepare_requests, 1);

    ctrl.notify_ready_to_sleep();
    ctrl.tick(&clock, &mut hw, &mut sink);

    assert_eq!(ctrl.state(), StateId::Sleeping);
    assert_eq!(hw.sleeps.len(), 1);
    assert_eq!(hw.reads, 0, "never samples a missing sensor");
}

#[test]
fn sleep_cycle_node_can_be_configured_to_halt() {
    let mut config = NodeConfig::battery();
    config.init_failure = InitFailurePolicy::Halt;
    let mut hw = MockNode::new();
    hw.sensor_present = false;
    let clock = MockClock::at(0);
    let mut sink = RecordingSink::new();
    let mut ctrl = PowerModeController::new(config).unwrap();

    assert!(ctrl.start(&clock, &mut hw, &mut sink).is_err());
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(ctrl.state(), StateId::Halted);
    assert!(hw.sleeps.is_empty());
}

#[test]
fn tick_before_start_is_ignored() {
    let mut hw = MockNode::new();
    let clock = MockClock::at(0);
    let mut sink = RecordingSink::new();
    let mut ctrl = PowerModeController::new(NodeConfig::mains()).unwrap();

    assert_eq!(ctrl.tick(&clock, &mut hw, &mut sink), StateId::Idle);
    assert_eq!(hw.reads, 0);
    assert!(sink.events.is_empty());
}

// ── Continuous timing ────────────────────────────────────────

#[test]
fn fixed_interval_with_failing_transport_samples_once_per_interval() {
    let mut hw = MockNode::new();
    hw.fail_publish = true;
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    // Tick every second for five minutes, t = 0 ..= 300 s.
    for _ in 0..=300 {
        ctrl.tick(&clock, &mut hw, &mut sink);
        clock.advance(1_000);
    }
    assert_eq!(hw.reads, 300 / 60);
    assert!(hw.published.is_empty());
}

#[test]
fn continuous_node_waits_one_interval_after_boot() {
    let mut hw = MockNode::new();
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 0, "nothing is due at boot");

    clock.advance(INTERVAL_MS - 1);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 0);

    clock.advance(1);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 1);
    assert_eq!(ctrl.cycle_state().last_cycle_ms, INTERVAL_MS);
}

#[test]
fn per_field_with_failing_transport_retries_every_tick() {
    let mut config = NodeConfig::mains();
    config.timing = TimingPolicy::PerField;
    let mut hw = MockNode::new();
    hw.fail_publish = true;
    let (mut ctrl, clock, mut sink) = started(config, &mut hw);

    clock.advance(INTERVAL_MS);
    for _ in 0..10 {
        ctrl.tick(&clock, &mut hw, &mut sink);
        clock.advance(1_000);
    }
    assert_eq!(hw.reads, 10);

    // Once something goes out the interval timer restarts.
    hw.fail_publish = false;
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 11);
    for _ in 0..59 {
        clock.advance(1_000);
        ctrl.tick(&clock, &mut hw, &mut sink);
    }
    assert_eq!(hw.reads, 11);
    clock.advance(1_000);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 12);
}

#[test]
fn per_field_rejected_reading_retries_next_tick() {
    let mut config = NodeConfig::mains();
    config.timing = TimingPolicy::PerField;
    let mut hw = MockNode::new().with_sample(Some(99.0), Some(5.0), Some(500.0), None);
    let (mut ctrl, clock, mut sink) = started(config, &mut hw);

    tick_first_cycle(&mut ctrl, &clock, &mut hw, &mut sink);
    clock.advance(50);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 2);
    assert!(hw.values().is_empty());
}

#[test]
fn interval_survives_clock_wraparound() {
    let mut hw = MockNode::new();
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    clock.set(u32::MAX - 500);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 1);

    clock.advance(59_999);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 1, "interval not yet elapsed across the wrap");

    clock.advance(1);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 2);
}

#[test]
fn no_cycle_overlaps_within_one_tick() {
    let mut hw = MockNode::new();
    let mut config = NodeConfig::mains();
    config.mode = PowerMode::Continuous { interval_secs: 1 };
    let (mut ctrl, clock, mut sink) = started(config, &mut hw);

    // A huge clock jump still runs a single cycle per tick.
    clock.advance(10_000_000);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 1);
    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(hw.reads, 1);
}

// ── Units, naming, diagnostics ───────────────────────────────

#[test]
fn units_are_advertised_once_when_connected() {
    let mut hw = MockNode::new();
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    for _ in 0..3 {
        ctrl.tick(&clock, &mut hw, &mut sink);
        clock.advance(60_000);
    }
    assert_eq!(
        hw.units(),
        vec![
            ("temperature", "C"),
            ("humidity", "%"),
            ("pressure", "hPa"),
            ("battery", "V"),
        ]
    );
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::UnitsAdvertised(_))),
        1
    );
}

#[test]
fn minimal_battery_node_uses_all_or_nothing_and_descriptive_names() {
    let mut hw = MockNode::new();
    let (mut ctrl, clock, mut sink) = started(NodeConfig::battery_minimal(), &mut hw);

    ctrl.tick(&clock, &mut hw, &mut sink);
    assert_eq!(
        hw.values(),
        vec![
            ("temperature", "degrees", "22.5"),
            ("humidity", "relative", "55.0"),
            ("pressure", "pressure", "1000.0"),
            ("battery", "voltage", "3.3"),
        ]
    );
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Sampled(_))), 0);
}

#[test]
fn all_or_nothing_drops_everything_when_one_field_is_missing() {
    let mut hw = MockNode::new().with_sample(Some(22.5), Some(55.0), Some(984.0), None);
    let (mut ctrl, clock, mut sink) = started(NodeConfig::battery_minimal(), &mut hw);

    ctrl.tick(&clock, &mut hw, &mut sink);
    assert!(hw.values().is_empty());
    assert_eq!(ctrl.state(), StateId::PreparingSleep);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::FieldRejected { .. })),
        0,
        "no per-field diagnostics when disabled"
    );
}

#[test]
fn cycle_report_carries_reading_and_sent_fields() {
    let mut hw = MockNode::new().with_sample(Some(50.0), Some(55.0), Some(984.0), Some(3.3));
    let (mut ctrl, clock, mut sink) = started(NodeConfig::mains(), &mut hw);

    tick_first_cycle(&mut ctrl, &clock, &mut hw, &mut sink);

    let report = sink
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::CycleCompleted(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(report.reading.get(Field::Temperature), Some(50.0));
    assert_eq!(report.verdicts.accepted_count(), 3);
    assert!(!report.sent.contains(Field::Temperature));
    assert!(report.sent.contains(Field::Humidity));
    assert_eq!(report.sent.len(), 3);
}
