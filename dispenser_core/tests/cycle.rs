//! Full dispense cycles driven by scripted devices and a manual clock.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dispenser_core::mocks::{
    CollectingSink, RecordingActuator, ScriptedButtons, ScriptedMotion, ScriptedRange,
};
use dispenser_core::{
    CooldownCfg, DetectionState, DispenseController, DispenserError, ExtraDispenseCfg,
    ExtraOutcome, Reporter, Review, StepOutcome,
};
use dispenser_traits::{ButtonLevels, DeviceError, MotionSensor, ReviewButtons};
use dispenser_traits::clock::test_clock::TestClock;

const NEAR: f32 = 10.0;
const FAR: f32 = 40.0;

fn no_extra() -> ExtraDispenseCfg {
    ExtraDispenseCfg {
        enabled: false,
        ..ExtraDispenseCfg::default()
    }
}

fn no_restart() -> CooldownCfg {
    CooldownCfg {
        restart_delay_ms: 0,
        ..CooldownCfg::default()
    }
}

fn step_until_completed(ctrl: &mut DispenseController, max_steps: usize) -> dispenser_core::CycleReport {
    for _ in 0..max_steps {
        if let StepOutcome::Completed(report) = ctrl.step().expect("step") {
            return report;
        }
    }
    panic!("no cycle completed within {max_steps} steps");
}

#[test]
fn gesture_drives_state_machine_and_dispenses() {
    let clock = TestClock::new();
    let actuator = RecordingActuator::new();
    let angles = actuator.angles();
    let sink = CollectingSink::new();

    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![20.0, 20.0, NEAR]))
        .with_motion_sensor(ScriptedMotion::new(vec![false, true, true, false]))
        .with_actuator(actuator)
        .with_buttons(ScriptedButtons::always_satisfied())
        .with_extra(no_extra())
        .with_cooldown(no_restart())
        .with_reporter(Reporter::spawn(sink.clone(), 4))
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");

    assert_eq!(ctrl.step().unwrap(), StepOutcome::Waiting(DetectionState::Idle));
    assert_eq!(ctrl.step().unwrap(), StepOutcome::Waiting(DetectionState::Idle));
    assert_eq!(
        ctrl.step().unwrap(),
        StepOutcome::Transition {
            from: DetectionState::Idle,
            to: DetectionState::PalmDetected
        }
    );
    assert_eq!(
        ctrl.step().unwrap(),
        StepOutcome::Waiting(DetectionState::PalmDetected)
    );
    assert_eq!(
        ctrl.step().unwrap(),
        StepOutcome::Transition {
            from: DetectionState::PalmDetected,
            to: DetectionState::MotionStarted
        }
    );
    assert_eq!(
        ctrl.step().unwrap(),
        StepOutcome::Waiting(DetectionState::MotionStarted)
    );

    let StepOutcome::Completed(report) = ctrl.step().unwrap() else {
        panic!("expected a completed cycle");
    };
    assert_eq!(report.gesture, Duration::from_millis(200));
    assert_eq!(report.record.gesture_ms, 200);
    assert_eq!(report.record.review, Review::Satisfactory);
    assert!((report.length_inches - 0.2).abs() < 1e-4);
    assert!((report.angle_deg - 20.0).abs() < 1e-3);
    assert_eq!(report.extra, ExtraOutcome::Disabled);
    assert_eq!(
        report.timing.palm_to_motion(),
        Some(Duration::from_millis(200))
    );

    // Primary feed then rest.
    let angles = angles.borrow().clone();
    assert_eq!(angles.len(), 2);
    assert!((angles[0] - 20.0).abs() < 1e-3);
    assert_eq!(angles[1], 0.0);

    assert_eq!(ctrl.state(), DetectionState::Idle);
    assert!(!ctrl.detection_enabled());
    assert_eq!(ctrl.cycles_completed(), 1);

    drop(ctrl); // drains the reporter
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].gesture_ms, 200);
}

/// PIR level scripted per control-loop iteration, independent of how often
/// the controller actually reads it.
struct PerIterationMotion {
    levels: Vec<bool>,
    clock: TestClock,
    poll: Duration,
}

impl MotionSensor for PerIterationMotion {
    fn is_active(&mut self) -> Result<bool, DeviceError> {
        let iteration = (self.clock.elapsed().as_millis() / self.poll.as_millis()) as usize;
        Ok(self.levels.get(iteration).or(self.levels.last()).copied().unwrap_or(false))
    }
}

#[test]
fn sampled_distance_and_pir_sequences_complete_one_cycle() {
    let clock = TestClock::new();
    let idle = ButtonLevels::default();
    let more = ButtonLevels {
        more: true,
        ..ButtonLevels::default()
    };
    let less = ButtonLevels {
        less: true,
        ..ButtonLevels::default()
    };
    let sink = CollectingSink::new();

    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![20.0, 20.0, 10.0, 10.0, 10.0]))
        .with_motion_sensor(PerIterationMotion {
            levels: vec![false, false, true, true, false],
            clock: clock.clone(),
            poll: Duration::from_millis(100),
        })
        .with_actuator(RecordingActuator::new())
        .with_buttons(ScriptedButtons::new(vec![idle, more, less]))
        .with_extra(no_extra())
        .with_cooldown(no_restart())
        .with_reporter(Reporter::spawn(sink.clone(), 4))
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");

    let outcomes: Vec<StepOutcome> = (0..5).map(|_| ctrl.step().expect("step")).collect();
    assert_eq!(outcomes[0], StepOutcome::Waiting(DetectionState::Idle));
    assert_eq!(outcomes[1], StepOutcome::Waiting(DetectionState::Idle));
    assert_eq!(
        outcomes[2],
        StepOutcome::Transition {
            from: DetectionState::Idle,
            to: DetectionState::PalmDetected
        }
    );
    assert_eq!(
        outcomes[3],
        StepOutcome::Transition {
            from: DetectionState::PalmDetected,
            to: DetectionState::MotionStarted
        }
    );
    let StepOutcome::Completed(report) = outcomes[4] else {
        panic!("expected completion on the PIR-low sample, got {:?}", outcomes[4]);
    };

    // PIR high sampled at t=300, low at t=400.
    assert_eq!(report.timing.palm_to_motion(), Some(Duration::from_millis(100)));
    assert_eq!(report.gesture, Duration::from_millis(100));
    assert_eq!(report.record.gesture_ms, 100);
    assert_eq!(report.record.review, Review::More);

    drop(ctrl);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].review, Review::More);
}

/// Records the controller phase seen by the observer at each button read.
struct PhaseCheckingButtons {
    phase: Rc<Cell<DetectionState>>,
    seen: Rc<RefCell<Vec<DetectionState>>>,
}

impl ReviewButtons for PhaseCheckingButtons {
    fn read(&mut self) -> Result<ButtonLevels, DeviceError> {
        self.seen.borrow_mut().push(self.phase.get());
        let pressed = self.seen.borrow().len() >= 2;
        Ok(ButtonLevels {
            satisfactory: pressed,
            ..ButtonLevels::default()
        })
    }
}

#[test]
fn observer_sees_review_phase_inside_cycle() {
    use DetectionState::*;

    let phase = Rc::new(Cell::new(Idle));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let transitions = Rc::new(RefCell::new(Vec::new()));
    let (phase_w, transitions_w) = (phase.clone(), transitions.clone());

    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![NEAR]))
        .with_motion_sensor(ScriptedMotion::new(vec![true, false]))
        .with_actuator(RecordingActuator::new())
        .with_buttons(PhaseCheckingButtons {
            phase: phase.clone(),
            seen: seen.clone(),
        })
        .with_extra(no_extra())
        .with_cooldown(no_restart())
        .with_state_observer(move |from, to| {
            phase_w.set(to);
            transitions_w.borrow_mut().push((from, to));
        })
        .with_clock(Box::new(TestClock::new()))
        .build()
        .expect("build");

    step_until_completed(&mut ctrl, 10);
    assert_eq!(
        *transitions.borrow(),
        vec![
            (Idle, PalmDetected),
            (PalmDetected, MotionStarted),
            (MotionStarted, CollectingFeedback),
            (CollectingFeedback, Idle),
        ]
    );
    assert_eq!(*seen.borrow(), vec![CollectingFeedback, CollectingFeedback]);
    assert_eq!(phase.get(), Idle);
}

#[test]
fn cooldown_blocks_sensing_until_period_elapses() {
    let clock = TestClock::new();
    let range = ScriptedRange::new(vec![NEAR]);
    let range_reads = range.reads();

    let mut ctrl = DispenseController::builder()
        .with_range_sensor(range)
        .with_motion_sensor(ScriptedMotion::new(vec![true, false]))
        .with_actuator(RecordingActuator::new())
        .with_buttons(ScriptedButtons::always_satisfied())
        .with_extra(no_extra())
        .with_cooldown(no_restart())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");

    step_until_completed(&mut ctrl, 10);
    // Palm at 0, motion 100..200, settle 1000: gate closed at t=1200.
    assert_eq!(clock.elapsed(), Duration::from_millis(1300));
    let reads_at_close = range_reads.get();

    // Checks at t=1300..=6100 are still inside the 5000 ms window.
    for _ in 0..49 {
        assert_eq!(ctrl.step().unwrap(), StepOutcome::CoolingDown);
    }
    assert_eq!(range_reads.get(), reads_at_close, "no sensing while disabled");
    // t=6200 is exactly disabled_at + period.
    assert_eq!(ctrl.step().unwrap(), StepOutcome::Reenabled);
    assert!(ctrl.detection_enabled());

    // Sensing resumes on the next iteration.
    ctrl.step().unwrap();
    assert_eq!(range_reads.get(), reads_at_close + 1);
}

#[test]
fn restart_delay_follows_cycle() {
    let clock = TestClock::new();
    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![NEAR]))
        .with_motion_sensor(ScriptedMotion::new(vec![true, false]))
        .with_actuator(RecordingActuator::new())
        .with_buttons(ScriptedButtons::always_satisfied())
        .with_extra(no_extra())
        .with_cooldown(CooldownCfg {
            period_ms: 5000,
            restart_delay_ms: 5000,
        })
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");

    step_until_completed(&mut ctrl, 10);
    // Gate closed at 1200, restart delay to 6200, poll to 6300.
    assert_eq!(clock.elapsed(), Duration::from_millis(6300));
    // The restart delay counts toward the cooldown.
    assert_eq!(ctrl.step().unwrap(), StepOutcome::Reenabled);
}

fn extra_cycle(range: Vec<f32>) -> (dispenser_core::CycleReport, Vec<f32>, TestClock) {
    let clock = TestClock::new();
    let actuator = RecordingActuator::new();
    let angles = actuator.angles();
    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(range))
        .with_motion_sensor(ScriptedMotion::new(vec![true, false]))
        .with_actuator(actuator)
        .with_buttons(ScriptedButtons::always_satisfied())
        .with_cooldown(no_restart())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");
    let report = step_until_completed(&mut ctrl, 10);
    let angles = angles.borrow().clone();
    (report, angles, clock)
}

#[test]
fn extra_feed_skipped_when_hand_gone() {
    // palm, motion start, motion end, re-check
    let (report, angles, clock) = extra_cycle(vec![NEAR, NEAR, NEAR, FAR]);
    assert_eq!(report.extra, ExtraOutcome::NotNeeded);
    assert_eq!(angles.len(), 2);
    // 200 ms of polling, settle 1000, check delay 3000, final poll 100.
    assert_eq!(clock.elapsed(), Duration::from_millis(4300));
}

#[test]
fn extra_feed_stops_when_hand_withdrawn() {
    let (report, angles, _) = extra_cycle(vec![NEAR, NEAR, NEAR, NEAR, NEAR, NEAR, FAR]);
    assert_eq!(
        report.extra,
        ExtraOutcome::Fed {
            steps: 3,
            withdrawn: true
        }
    );
    // primary, rest, 0/10/20, rest
    assert_eq!(angles.len(), 6);
    assert_eq!(&angles[2..], &[0.0, 10.0, 20.0, 0.0]);
}

#[test]
fn extra_feed_runs_full_travel_when_hand_stays() {
    let (report, angles, clock) = extra_cycle(vec![NEAR]);
    assert_eq!(
        report.extra,
        ExtraOutcome::Fed {
            steps: 19,
            withdrawn: false
        }
    );
    assert_eq!(angles.len(), 2 + 19 + 1);
    assert_eq!(angles[angles.len() - 2], 180.0);
    assert_eq!(angles[angles.len() - 1], 0.0);
    // 200 + 1000 + 3000 + 19 * 500 + 100
    assert_eq!(clock.elapsed(), Duration::from_millis(13_800));
}

#[test]
fn review_waits_for_press_and_honours_priority() {
    let clock = TestClock::new();
    let idle = ButtonLevels::default();
    let both = ButtonLevels {
        less: true,
        more: true,
        ..ButtonLevels::default()
    };
    let buttons = ScriptedButtons::new(vec![idle, idle, idle, both]);
    let button_reads = buttons.reads();

    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![NEAR]))
        .with_motion_sensor(ScriptedMotion::new(vec![true, false]))
        .with_actuator(RecordingActuator::new())
        .with_buttons(buttons)
        .with_extra(no_extra())
        .with_cooldown(no_restart())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");

    let report = step_until_completed(&mut ctrl, 10);
    assert_eq!(report.record.review, Review::Less);
    assert_eq!(button_reads.get(), 4);
    // Three idle polls at 100 ms each on top of the base cycle.
    assert_eq!(clock.elapsed(), Duration::from_millis(1600));
}

#[test]
fn actuator_fault_parks_and_resets() {
    let clock = TestClock::new();
    // Primary command succeeds; the return-to-rest fails.
    let actuator = RecordingActuator::failing_from(1);
    let angles = actuator.angles();

    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![NEAR]))
        .with_motion_sensor(ScriptedMotion::new(vec![true, false]))
        .with_actuator(actuator)
        .with_buttons(ScriptedButtons::always_satisfied())
        .with_extra(no_extra())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");

    ctrl.step().unwrap();
    ctrl.step().unwrap();
    let err = ctrl.step().expect_err("actuator fault surfaces");
    assert!(
        matches!(
            err.downcast_ref::<DispenserError>(),
            Some(DispenserError::Hardware(msg)) if msg.contains("servo bus fault")
        ),
        "unexpected error: {err:?}"
    );
    // Best-effort park after the failure.
    assert_eq!(angles.borrow().last(), Some(&0.0));
    assert_eq!(ctrl.state(), DetectionState::Idle);
    assert!(ctrl.detection_enabled());
    assert_eq!(ctrl.cycles_completed(), 0);
}

#[test]
fn stop_request_interrupts_review() {
    let clock = TestClock::new();
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let actuator = RecordingActuator::new();
    let angles = actuator.angles();

    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![NEAR]))
        .with_motion_sensor(ScriptedMotion::new(vec![true, false]))
        .with_actuator(actuator)
        .with_buttons(ScriptedButtons::new(vec![ButtonLevels::default()]))
        .with_stop_check(move || stop_flag.load(Ordering::Relaxed))
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("build");

    ctrl.step().unwrap();
    ctrl.step().unwrap();
    stop.store(true, Ordering::Relaxed);
    let err = ctrl.step().expect_err("interrupted");
    assert!(matches!(
        err.downcast_ref::<DispenserError>(),
        Some(DispenserError::Interrupted)
    ));
    // Extra feed bailed out before its first step; actuator is at rest.
    assert_eq!(angles.borrow().last(), Some(&0.0));
    assert_eq!(ctrl.state(), DetectionState::Idle);
}

#[test]
fn nan_and_timeout_readings_never_count_as_presence() {
    let actuator = RecordingActuator::new();
    let angles = actuator.angles();
    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![f32::NAN, f32::INFINITY, 15.0]))
        .with_motion_sensor(ScriptedMotion::new(vec![true]))
        .with_actuator(actuator)
        .with_buttons(ScriptedButtons::always_satisfied())
        .with_clock(Box::new(TestClock::new()))
        .build()
        .expect("build");
    for _ in 0..5 {
        assert_eq!(ctrl.step().unwrap(), StepOutcome::Waiting(DetectionState::Idle));
    }
    assert!(angles.borrow().is_empty());
}
