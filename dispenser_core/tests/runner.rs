use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dispenser_core::mocks::{CollectingSink, RecordingActuator, ScriptedButtons, ScriptedMotion, ScriptedRange};
use dispenser_core::{CooldownCfg, DispenseController, Reporter, Review, RunSummary, run};
use dispenser_hardware::{SceneCfg, simulated_rig};
use dispenser_traits::clock::test_clock::TestClock;
use rstest::rstest;

#[rstest]
#[case(1)]
#[case(3)]
fn simulated_visitors_complete_requested_cycles(#[case] cycles: u64) {
    let (scene, range, pir, servo, buttons) = simulated_rig(SceneCfg {
        arrive_after: 2,
        motion_delay: 1,
        motion_reads: 4,
        ..SceneCfg::default()
    });
    let sink = CollectingSink::new();
    let mut ctrl = DispenseController::builder()
        .with_range_sensor(range)
        .with_motion_sensor(pir)
        .with_actuator(servo)
        .with_buttons(buttons)
        .with_cooldown(CooldownCfg {
            period_ms: 0,
            restart_delay_ms: 0,
        })
        .with_reporter(Reporter::spawn(sink.clone(), 8))
        .with_clock(Box::new(TestClock::new()))
        .build()
        .expect("build");

    let shutdown = AtomicBool::new(false);
    let summary = run(&mut ctrl, &shutdown, Some(cycles));
    assert_eq!(summary.cycles, cycles);
    assert_eq!(summary.errors, 0);
    assert!(!summary.interrupted);
    assert_eq!(u64::from(scene.borrow().visitors()), cycles);
    assert_eq!(scene.borrow().last_angle(), 0.0);

    drop(ctrl);
    let records = sink.records();
    assert_eq!(records.len() as u64, cycles);
    // Four PIR-high polls at 100 ms.
    assert!(records.iter().all(|r| r.gesture_ms == 400 && r.review == Review::Satisfactory));
}

#[rstest]
fn preset_shutdown_exits_before_sensing() {
    let range = ScriptedRange::new(vec![5.0]);
    let reads = range.reads();
    let mut ctrl = DispenseController::builder()
        .with_range_sensor(range)
        .with_motion_sensor(ScriptedMotion::new(vec![false]))
        .with_actuator(RecordingActuator::new())
        .with_buttons(ScriptedButtons::always_satisfied())
        .with_clock(Box::new(TestClock::new()))
        .build()
        .expect("build");

    let shutdown = AtomicBool::new(true);
    let summary = run(&mut ctrl, &shutdown, None);
    assert_eq!(
        summary,
        RunSummary {
            iterations: 0,
            cycles: 0,
            errors: 0,
            interrupted: true
        }
    );
    assert_eq!(reads.get(), 0);
}

/// Fails every command; requests shutdown once `limit` commands have failed.
struct BrokenServo {
    failures: usize,
    limit: usize,
    shutdown: Arc<AtomicBool>,
}

impl dispenser_traits::Actuator for BrokenServo {
    fn set_angle(&mut self, _degrees: f32) -> Result<(), dispenser_traits::DeviceError> {
        self.failures += 1;
        if self.failures >= self.limit {
            self.shutdown.store(true, Ordering::Relaxed);
        }
        Err("servo unplugged".into())
    }
}

#[rstest]
fn iteration_errors_are_counted_and_loop_continues() {
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut ctrl = DispenseController::builder()
        .with_range_sensor(ScriptedRange::new(vec![5.0]))
        .with_motion_sensor(ScriptedMotion::new(vec![true, false, true, false, true, false]))
        // Each failed cycle issues the feed command and the park command.
        .with_actuator(BrokenServo {
            failures: 0,
            limit: 6,
            shutdown: shutdown.clone(),
        })
        .with_buttons(ScriptedButtons::always_satisfied())
        .with_clock(Box::new(TestClock::new()))
        .build()
        .expect("build");

    let summary = run(&mut ctrl, &shutdown, None);
    assert_eq!(summary.errors, 3);
    assert_eq!(summary.cycles, 0);
    assert_eq!(summary.iterations, 9);
    assert!(summary.interrupted);
    assert_eq!(ctrl.state(), dispenser_core::DetectionState::Idle);
}
