use std::sync::Arc;
use std::time::Duration;

use dispenser_traits::{Actuator, Clock, MotionSensor, RangeSensor, ReviewButtons};
use eyre::WrapErr;
use tracing::{debug, info, warn};

use crate::builder::{DispenserBuilder, Missing};
use crate::config::{
    CooldownCfg, DetectionCfg, DispenseCfg, ExtraDispenseCfg, FeedbackCfg, REST_ANGLE_DEG,
};
use crate::error::{DispenserError, Result};
use crate::feedback::{Review, wait_for_review};
use crate::hw_error::map_hw_error;
use crate::policy::{convert_to_angle, extra_step_angles, required_length_inches};
use crate::report::{InteractionRecord, Reporter};
use crate::state::{CooldownGate, DetectionState, GestureTiming};
use crate::status::{CycleReport, ExtraOutcome, StepOutcome};

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Presence-triggered dispense controller.
///
/// Call [`step`](Self::step) in a loop. Each call samples the sensors once,
/// advances the detection state, and sleeps for the poll interval. When a
/// gesture ends, the same call runs the whole dispense cycle: primary feed,
/// optional extra feed, review, report, then cooldown.
pub struct DispenseController {
    pub(crate) range: Box<dyn RangeSensor>,
    pub(crate) motion: Box<dyn MotionSensor>,
    pub(crate) actuator: Box<dyn Actuator>,
    pub(crate) buttons: Box<dyn ReviewButtons>,
    pub(crate) reporter: Option<Reporter>,
    pub(crate) detection: DetectionCfg,
    pub(crate) dispense: DispenseCfg,
    pub(crate) extra: ExtraDispenseCfg,
    pub(crate) feedback: FeedbackCfg,
    pub(crate) cooldown: CooldownCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) stop_check: Option<Box<dyn Fn() -> bool>>,
    pub(crate) observer: Option<Box<dyn Fn(DetectionState, DetectionState)>>,
    pub(crate) state: DetectionState,
    pub(crate) timing: GestureTiming,
    pub(crate) gate: CooldownGate,
    pub(crate) cycles: u64,
    pub(crate) last_cycle: Option<CycleReport>,
}

impl std::fmt::Debug for DispenseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispenseController")
            .field("state", &self.state)
            .field("detection_enabled", &self.gate.is_open())
            .field("cycles", &self.cycles)
            .finish()
    }
}

impl DispenseController {
    pub fn builder() -> DispenserBuilder<Missing, Missing, Missing, Missing> {
        DispenserBuilder::default()
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn timing(&self) -> &GestureTiming {
        &self.timing
    }

    pub fn detection_enabled(&self) -> bool {
        self.gate.is_open()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles
    }

    pub fn last_cycle(&self) -> Option<&CycleReport> {
        self.last_cycle.as_ref()
    }

    pub fn reporter(&self) -> Option<&Reporter> {
        self.reporter.as_ref()
    }

    /// Consume the controller, handing back the reporter so the caller can
    /// flush it and read final counts.
    pub fn into_reporter(self) -> Option<Reporter> {
        self.reporter
    }

    /// Drop back to `Idle` and forget the current gesture. The cooldown gate
    /// is left as is.
    pub fn reset(&mut self) {
        self.set_state(DetectionState::Idle);
        self.timing = GestureTiming::default();
    }

    /// One iteration of the control loop, including the trailing poll delay.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let outcome = self.poll_once();
        self.clock.sleep(self.detection.poll_interval());
        outcome
    }

    fn poll_once(&mut self) -> Result<StepOutcome> {
        if !self.gate.is_open() {
            let now = self.clock.now();
            if self.gate.try_reopen(now, self.cooldown.period()) {
                info!("detection re-enabled");
                return Ok(StepOutcome::Reenabled);
            }
            return Ok(StepOutcome::CoolingDown);
        }

        let distance = self.read_distance()?;
        match self.state {
            DetectionState::Idle => {
                if self.detection.hand_present(distance) {
                    self.timing = GestureTiming::palm_at(self.clock.now());
                    info!(distance_cm = distance, "palm detected by ultrasonic sensor");
                    return Ok(self.transition(DetectionState::PalmDetected));
                }
            }
            DetectionState::PalmDetected => {
                if self.read_motion()? {
                    self.timing.motion_start = Some(self.clock.now());
                    info!("motion detected by PIR sensor, timing gesture");
                    return Ok(self.transition(DetectionState::MotionStarted));
                }
            }
            DetectionState::MotionStarted => {
                if !self.read_motion()? {
                    self.timing.motion_end = Some(self.clock.now());
                    return self.complete_cycle().map(StepOutcome::Completed);
                }
            }
            // A cycle always leaves this state before `step` returns.
            DetectionState::CollectingFeedback => {
                warn!("found controller mid-review outside a cycle, resetting");
                self.reset();
            }
        }
        Ok(StepOutcome::Waiting(self.state))
    }

    fn transition(&mut self, to: DetectionState) -> StepOutcome {
        let from = self.state;
        self.set_state(to);
        StepOutcome::Transition { from, to }
    }

    fn set_state(&mut self, to: DetectionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!(%from, %to, "state transition");
        if let Some(observer) = &self.observer {
            observer(from, to);
        }
    }

    fn complete_cycle(&mut self) -> Result<CycleReport> {
        match self.run_cycle() {
            Ok(report) => Ok(report),
            Err(e) => {
                self.park_actuator();
                self.reset();
                Err(e)
            }
        }
    }

    fn run_cycle(&mut self) -> Result<CycleReport> {
        let Some(gesture) = self.timing.motion_duration() else {
            return Err(eyre::Report::new(DispenserError::State(
                "gesture ended without motion timestamps".into(),
            )));
        };
        let gesture_ms = u64::try_from(gesture.as_millis()).unwrap_or(u64::MAX);
        if let Some(latency) = self.timing.palm_to_motion() {
            info!(
                latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                "palm-to-motion latency"
            );
        }
        info!(duration_ms = gesture_ms, "motion ended");

        let length_inches = required_length_inches(gesture, &self.dispense);
        info!(length_in = length_inches, "paper length required");
        let angle_deg = self.primary_dispense(length_inches)?;
        let extra = self.extra_dispense()?;

        self.set_state(DetectionState::CollectingFeedback);
        info!("waiting for user review");
        let review = self.collect_review()?;
        let record = InteractionRecord::new(gesture, review);
        self.submit(record);

        self.gate.close(self.clock.now());
        info!(cooldown_ms = self.cooldown.period_ms, "detection disabled");
        self.set_state(DetectionState::Idle);

        let report = CycleReport {
            record,
            timing: self.timing,
            gesture,
            length_inches,
            angle_deg,
            extra,
        };
        self.cycles = self.cycles.saturating_add(1);
        self.last_cycle = Some(report);

        if self.cooldown.restart_delay_ms > 0 {
            debug!(delay_ms = self.cooldown.restart_delay_ms, "restart delay");
            self.clock.sleep(millis(self.cooldown.restart_delay_ms));
        }
        Ok(report)
    }

    fn primary_dispense(&mut self, length_inches: f32) -> Result<f32> {
        let angle = convert_to_angle(length_inches, &self.dispense);
        info!(angle_deg = angle, "rotating servo to dispense paper");
        self.command_angle(angle)?;
        self.clock.sleep(millis(self.dispense.settle_ms));
        self.command_angle(REST_ANGLE_DEG)?;
        Ok(angle)
    }

    fn extra_dispense(&mut self) -> Result<ExtraOutcome> {
        if !self.extra.enabled {
            return Ok(ExtraOutcome::Disabled);
        }
        info!(
            delay_ms = self.extra.check_delay_ms,
            "waiting before checking for additional paper requirement"
        );
        self.clock.sleep(millis(self.extra.check_delay_ms));
        let distance = self.read_distance()?;
        if !self.detection.hand_present(distance) {
            info!("no additional paper required");
            return Ok(ExtraOutcome::NotNeeded);
        }

        info!(distance_cm = distance, "palm still detected, dispensing extra paper slowly");
        let mut steps = 0u32;
        let mut withdrawn = false;
        for angle in extra_step_angles(self.extra.step_deg, self.dispense.max_angle_deg) {
            if self.stop_requested() {
                debug!(steps, "extra dispense interrupted");
                break;
            }
            self.command_angle(angle)?;
            steps += 1;
            self.clock.sleep(millis(self.extra.step_pause_ms));
            let distance = self.read_distance()?;
            if !self.detection.hand_present(distance) {
                info!(steps, "palm removed during extra dispensing");
                withdrawn = true;
                break;
            }
        }
        self.command_angle(REST_ANGLE_DEG)?;
        info!(steps, "extra paper dispensing completed");
        Ok(ExtraOutcome::Fed { steps, withdrawn })
    }

    fn collect_review(&mut self) -> Result<Review> {
        wait_for_review(
            &mut *self.buttons,
            &*self.clock,
            millis(self.feedback.poll_ms),
            self.stop_check.as_deref(),
        )
    }

    fn submit(&self, record: InteractionRecord) {
        match &self.reporter {
            Some(reporter) => {
                reporter.submit(record);
            }
            None => info!(
                pir_time = record.gesture_ms,
                user_review = record.review.as_str(),
                "interaction record (no reporter attached)"
            ),
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop_check.as_ref().is_some_and(|f| f())
    }

    fn read_distance(&mut self) -> Result<f32> {
        let cm = self
            .range
            .distance_cm()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading range sensor")?;
        debug!(distance_cm = cm, "range reading");
        Ok(cm)
    }

    fn read_motion(&mut self) -> Result<bool> {
        self.motion
            .is_active()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading motion sensor")
    }

    fn command_angle(&mut self, degrees: f32) -> Result<()> {
        self.actuator
            .set_angle(degrees)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("commanding actuator to {degrees} degrees"))
    }

    /// Best-effort return to rest after a failed cycle.
    fn park_actuator(&mut self) {
        if let Err(e) = self.actuator.set_angle(REST_ANGLE_DEG) {
            warn!(error = %e, "failed to return actuator to rest");
        }
    }
}
