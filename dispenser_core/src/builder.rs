//! Type-state builder for `DispenseController`.
//!
//! `build()` is only available once the range sensor, motion sensor, actuator
//! and review buttons have been provided. `try_build()` is always available
//! and reports what is missing at runtime.

use std::marker::PhantomData;
use std::sync::Arc;

use dispenser_traits::{Actuator, Clock, MonotonicClock, MotionSensor, RangeSensor, ReviewButtons};

use crate::config::{
    CooldownCfg, DetectionCfg, DispenseCfg, ExtraDispenseCfg, FeedbackCfg, MIN_EXTRA_STEP_DEG,
};
use crate::controller::DispenseController;
use crate::error::{BuildError, Result};
use crate::report::Reporter;
use crate::state::{CooldownGate, DetectionState, GestureTiming};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `DispenseController`. Type parameters track, in order, the
/// range sensor, motion sensor, actuator and buttons.
pub struct DispenserBuilder<R, P, A, B> {
    range: Option<Box<dyn RangeSensor>>,
    motion: Option<Box<dyn MotionSensor>>,
    actuator: Option<Box<dyn Actuator>>,
    buttons: Option<Box<dyn ReviewButtons>>,
    reporter: Option<Reporter>,
    detection: Option<DetectionCfg>,
    dispense: Option<DispenseCfg>,
    extra: Option<ExtraDispenseCfg>,
    feedback: Option<FeedbackCfg>,
    cooldown: Option<CooldownCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    stop_check: Option<Box<dyn Fn() -> bool>>,
    observer: Option<Box<dyn Fn(DetectionState, DetectionState)>>,
    _marker: PhantomData<(R, P, A, B)>,
}

impl Default for DispenserBuilder<Missing, Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            range: None,
            motion: None,
            actuator: None,
            buttons: None,
            reporter: None,
            detection: None,
            dispense: None,
            extra: None,
            feedback: None,
            cooldown: None,
            clock: None,
            stop_check: None,
            observer: None,
            _marker: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn finite_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn validate(
    detection: &DetectionCfg,
    dispense: &DispenseCfg,
    extra: &ExtraDispenseCfg,
    feedback: &FeedbackCfg,
) -> Result<()> {
    if !finite_positive(detection.distance_threshold_cm) {
        return Err(invalid("distance_threshold_cm must be > 0"));
    }
    if !dispense.inches_per_second.is_finite() || dispense.inches_per_second < 0.0 {
        return Err(invalid("inches_per_second must be >= 0"));
    }
    if !finite_positive(dispense.degrees_per_inch) {
        return Err(invalid("degrees_per_inch must be > 0"));
    }
    if !finite_positive(dispense.max_angle_deg) || dispense.max_angle_deg > 180.0 {
        return Err(invalid("max_angle_deg must be in (0, 180]"));
    }
    if !(MIN_EXTRA_STEP_DEG..=180.0).contains(&extra.step_deg) {
        return Err(invalid("step_deg must be in [1, 180]"));
    }
    if feedback.poll_ms == 0 {
        return Err(invalid("feedback poll_ms must be >= 1"));
    }
    Ok(())
}

impl<R, P, A, B> DispenserBuilder<R, P, A, B> {
    fn retag<R2, P2, A2, B2>(self) -> DispenserBuilder<R2, P2, A2, B2> {
        DispenserBuilder {
            range: self.range,
            motion: self.motion,
            actuator: self.actuator,
            buttons: self.buttons,
            reporter: self.reporter,
            detection: self.detection,
            dispense: self.dispense,
            extra: self.extra,
            feedback: self.feedback,
            cooldown: self.cooldown,
            clock: self.clock,
            stop_check: self.stop_check,
            observer: self.observer,
            _marker: PhantomData,
        }
    }

    pub fn with_detection(mut self, cfg: DetectionCfg) -> Self {
        self.detection = Some(cfg);
        self
    }

    pub fn with_dispense(mut self, cfg: DispenseCfg) -> Self {
        self.dispense = Some(cfg);
        self
    }

    pub fn with_extra(mut self, cfg: ExtraDispenseCfg) -> Self {
        self.extra = Some(cfg);
        self
    }

    pub fn with_feedback(mut self, cfg: FeedbackCfg) -> Self {
        self.feedback = Some(cfg);
        self
    }

    pub fn with_cooldown(mut self, cfg: CooldownCfg) -> Self {
        self.cooldown = Some(cfg);
        self
    }

    /// Without a reporter, records are only logged.
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Inject a clock (tests use a manual one). Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Polled while waiting for a review and between extra-feed steps.
    pub fn with_stop_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.stop_check = Some(Box::new(f));
        self
    }

    /// Called with `(from, to)` on every detection-state change, including the
    /// review phase that runs inside a single `step`.
    pub fn with_state_observer<F>(mut self, f: F) -> Self
    where
        F: Fn(DetectionState, DetectionState) + 'static,
    {
        self.observer = Some(Box::new(f));
        self
    }

    /// Validate and build, reporting missing devices at runtime.
    pub fn try_build(self) -> Result<DispenseController> {
        let range = self
            .range
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRangeSensor))?;
        let motion = self
            .motion
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotionSensor))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let buttons = self
            .buttons
            .ok_or_else(|| eyre::Report::new(BuildError::MissingButtons))?;

        let detection = self.detection.unwrap_or_default();
        let dispense = self.dispense.unwrap_or_default();
        let extra = self.extra.unwrap_or_default();
        let feedback = self.feedback.unwrap_or_default();
        let cooldown = self.cooldown.unwrap_or_default();
        validate(&detection, &dispense, &extra, &feedback)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => Arc::from(c),
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(DispenseController {
            range,
            motion,
            actuator,
            buttons,
            reporter: self.reporter,
            detection,
            dispense,
            extra,
            feedback,
            cooldown,
            clock,
            stop_check: self.stop_check,
            observer: self.observer,
            state: DetectionState::Idle,
            timing: GestureTiming::default(),
            gate: CooldownGate::new(),
            cycles: 0,
            last_cycle: None,
        })
    }
}

impl<P, A, B> DispenserBuilder<Missing, P, A, B> {
    pub fn with_range_sensor(mut self, sensor: impl RangeSensor + 'static) -> DispenserBuilder<Set, P, A, B> {
        self.range = Some(Box::new(sensor));
        self.retag()
    }
}

impl<R, A, B> DispenserBuilder<R, Missing, A, B> {
    pub fn with_motion_sensor(mut self, sensor: impl MotionSensor + 'static) -> DispenserBuilder<R, Set, A, B> {
        self.motion = Some(Box::new(sensor));
        self.retag()
    }
}

impl<R, P, B> DispenserBuilder<R, P, Missing, B> {
    pub fn with_actuator(mut self, actuator: impl Actuator + 'static) -> DispenserBuilder<R, P, Set, B> {
        self.actuator = Some(Box::new(actuator));
        self.retag()
    }
}

impl<R, P, A> DispenserBuilder<R, P, A, Missing> {
    pub fn with_buttons(mut self, buttons: impl ReviewButtons + 'static) -> DispenserBuilder<R, P, A, Set> {
        self.buttons = Some(Box::new(buttons));
        self.retag()
    }
}

impl DispenserBuilder<Set, Set, Set, Set> {
    /// Build with all devices present. Config is still validated.
    pub fn build(self) -> Result<DispenseController> {
        self.try_build()
    }
}
