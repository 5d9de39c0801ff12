//! Conversions from the TOML schema into runtime config.

use crate::config::{CooldownCfg, DetectionCfg, DispenseCfg, ExtraDispenseCfg, FeedbackCfg};

impl From<&dispenser_config::Detection> for DetectionCfg {
    fn from(d: &dispenser_config::Detection) -> Self {
        Self {
            distance_threshold_cm: d.distance_threshold_cm,
            poll_ms: d.poll_ms,
        }
    }
}

impl From<&dispenser_config::Dispense> for DispenseCfg {
    fn from(d: &dispenser_config::Dispense) -> Self {
        Self {
            inches_per_second: d.inches_per_second,
            degrees_per_inch: d.degrees_per_inch,
            max_angle_deg: d.max_angle_deg,
            settle_ms: d.settle_ms,
        }
    }
}

impl From<&dispenser_config::Extra> for ExtraDispenseCfg {
    fn from(e: &dispenser_config::Extra) -> Self {
        Self {
            enabled: e.enabled,
            check_delay_ms: e.check_delay_ms,
            step_deg: e.step_deg,
            step_pause_ms: e.step_pause_ms,
        }
    }
}

impl From<&dispenser_config::Feedback> for FeedbackCfg {
    fn from(f: &dispenser_config::Feedback) -> Self {
        Self { poll_ms: f.poll_ms }
    }
}

impl From<&dispenser_config::Cooldown> for CooldownCfg {
    fn from(c: &dispenser_config::Cooldown) -> Self {
        Self {
            period_ms: c.period_ms,
            restart_delay_ms: c.restart_delay_ms,
        }
    }
}
