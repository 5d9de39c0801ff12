//! Gesture-to-paper mapping.

use std::time::Duration;

use crate::config::DispenseCfg;

/// Paper length for a gesture held for `duration`.
#[inline]
pub fn required_length_inches(duration: Duration, cfg: &DispenseCfg) -> f32 {
    duration.as_secs_f32() * cfg.inches_per_second
}

/// Feed angle for `length_inches`, clamped to `[0, max_angle_deg]`.
/// NaN maps to the rest angle.
pub fn convert_to_angle(length_inches: f32, cfg: &DispenseCfg) -> f32 {
    let angle = length_inches * cfg.degrees_per_inch;
    if angle.is_nan() {
        return 0.0;
    }
    angle.clamp(0.0, cfg.max_angle_deg)
}

/// Upper bound on extra-feed commands: one per degree of travel plus rest.
pub const MAX_EXTRA_STEPS: u32 = 181;

/// Angles visited by the slow extra feed: `0, step, 2*step, ...` up to and
/// including `max_angle_deg`, never more than [`MAX_EXTRA_STEPS`] of them.
pub fn extra_step_angles(step_deg: f32, max_angle_deg: f32) -> impl Iterator<Item = f32> {
    let count = if step_deg > 0.0 && max_angle_deg >= 0.0 {
        ((max_angle_deg / step_deg).floor() as u32)
            .saturating_add(1)
            .min(MAX_EXTRA_STEPS)
    } else {
        1
    };
    (0..count).map(move |i| i as f32 * step_deg)
}
