//! Runtime configuration consumed by the controller.
//!
//! These mirror the TOML sections in `dispenser_config` but hold only what the
//! control loop needs. Defaults match the stock firmware.

use std::time::Duration;

/// Resting position of the feed actuator.
pub const REST_ANGLE_DEG: f32 = 0.0;

/// Smallest accepted extra-feed step. Bounds the stepping loop at 181 commands.
pub const MIN_EXTRA_STEP_DEG: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionCfg {
    /// A hand is present when the range reading is strictly below this (cm).
    pub distance_threshold_cm: f32,
    /// Delay after every control-loop iteration (ms).
    pub poll_ms: u64,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            distance_threshold_cm: 15.0,
            poll_ms: 100,
        }
    }
}

impl DetectionCfg {
    /// Strict comparison; NaN and infinite readings are never "present".
    #[inline]
    pub fn hand_present(&self, distance_cm: f32) -> bool {
        distance_cm < self.distance_threshold_cm
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispenseCfg {
    pub inches_per_second: f32,
    pub degrees_per_inch: f32,
    pub max_angle_deg: f32,
    pub settle_ms: u64,
}

impl Default for DispenseCfg {
    fn default() -> Self {
        Self {
            inches_per_second: 1.0,
            degrees_per_inch: 100.0,
            max_angle_deg: 180.0,
            settle_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtraDispenseCfg {
    pub enabled: bool,
    pub check_delay_ms: u64,
    pub step_deg: f32,
    pub step_pause_ms: u64,
}

impl Default for ExtraDispenseCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            check_delay_ms: 3000,
            step_deg: 10.0,
            step_pause_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackCfg {
    pub poll_ms: u64,
}

impl Default for FeedbackCfg {
    fn default() -> Self {
        Self { poll_ms: 100 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownCfg {
    /// Detection stays disabled for this long after a cycle (ms).
    pub period_ms: u64,
    /// Pause right after a cycle, before the loop resumes (ms).
    pub restart_delay_ms: u64,
}

impl Default for CooldownCfg {
    fn default() -> Self {
        Self {
            period_ms: 5000,
            restart_delay_ms: 5000,
        }
    }
}

impl CooldownCfg {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}
