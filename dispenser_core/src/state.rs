use std::time::{Duration, Instant};

/// Detection phase of the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DetectionState {
    /// Waiting for a hand under the range sensor.
    #[default]
    Idle,
    /// Hand present; waiting for the PIR line to rise.
    PalmDetected,
    /// Gesture in progress; waiting for the PIR line to fall.
    MotionStarted,
    /// Paper dispensed; waiting for a review button.
    CollectingFeedback,
}

impl DetectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PalmDetected => "palm_detected",
            Self::MotionStarted => "motion_started",
            Self::CollectingFeedback => "collecting_feedback",
        }
    }
}

impl std::fmt::Display for DetectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamps captured during one interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureTiming {
    pub ultrasonic_start: Option<Instant>,
    pub motion_start: Option<Instant>,
    pub motion_end: Option<Instant>,
}

impl GestureTiming {
    pub fn palm_at(now: Instant) -> Self {
        Self {
            ultrasonic_start: Some(now),
            ..Self::default()
        }
    }

    /// PIR high time, saturating at zero.
    pub fn motion_duration(&self) -> Option<Duration> {
        let (start, end) = (self.motion_start?, self.motion_end?);
        Some(end.saturating_duration_since(start))
    }

    /// Latency between palm detection and motion onset.
    pub fn palm_to_motion(&self) -> Option<Duration> {
        let (palm, motion) = (self.ultrasonic_start?, self.motion_start?);
        Some(motion.saturating_duration_since(palm))
    }
}

/// Detection lockout after a completed cycle.
///
/// Closed by `close`; reopens on the first `try_reopen` at or after
/// `disabled_at + period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownGate {
    enabled: bool,
    disabled_at: Option<Instant>,
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownGate {
    pub fn new() -> Self {
        Self {
            enabled: true,
            disabled_at: None,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.enabled
    }

    pub fn disabled_at(&self) -> Option<Instant> {
        self.disabled_at
    }

    pub fn close(&mut self, now: Instant) {
        self.enabled = false;
        self.disabled_at = Some(now);
    }

    /// Returns true only on the call that reopens the gate.
    pub fn try_reopen(&mut self, now: Instant, period: Duration) -> bool {
        if self.enabled {
            return false;
        }
        let elapsed = self
            .disabled_at
            .map_or(period, |at| now.saturating_duration_since(at));
        if elapsed >= period {
            self.enabled = true;
            self.disabled_at = None;
            return true;
        }
        false
    }
}
