//! Pulse timing helpers shared by the GPIO drivers.
//!
//! The line readers are plain closures so the timing logic can be exercised
//! without a GPIO chip.

use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Period of the hobby-servo PWM frame (50 Hz).
pub const SERVO_FRAME: Duration = Duration::from_millis(20);

/// Wait until `is_high()` reports `level`, or `deadline` passes.
///
/// Returns the instant the level was first observed. A zero `poll_interval`
/// spins instead of sleeping, for microsecond-scale pulses.
pub fn wait_for_level(
    mut is_high: impl FnMut() -> bool,
    level: bool,
    deadline: Instant,
    poll_interval: Duration,
) -> Result<Instant> {
    loop {
        if is_high() == level {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Width of the next complete high pulse on a line.
///
/// `timeout` bounds the whole measurement, including waiting for a pulse that
/// is already in progress to finish and for the next one to start.
pub fn measure_high_pulse(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration> {
    let deadline = Instant::now() + timeout;
    wait_for_level(&mut is_high, false, deadline, poll_interval)?;
    let rise = wait_for_level(&mut is_high, true, deadline, poll_interval)?;
    let fall = wait_for_level(&mut is_high, false, deadline, poll_interval)?;
    Ok(fall.saturating_duration_since(rise))
}

/// Convert a round-trip echo width to a one-way distance in centimeters.
#[inline]
pub fn echo_to_cm(width: Duration, sound_speed_cm_per_us: f32) -> f32 {
    (width.as_micros() as f32 * sound_speed_cm_per_us) / 2.0
}

/// Linear angle → pulse-width mapping for a 0..=180° servo.
pub fn angle_to_pulse(degrees: f32, min_pulse: Duration, max_pulse: Duration) -> Result<Duration> {
    if !degrees.is_finite() || !(0.0..=180.0).contains(&degrees) {
        return Err(HwError::InvalidAngle(degrees));
    }
    let span_us = max_pulse.saturating_sub(min_pulse).as_micros() as f64;
    let offset_us = (span_us * f64::from(degrees) / 180.0).round() as u64;
    Ok(min_pulse + Duration::from_micros(offset_us))
}

/// Busy-wait for short trigger pulses where `thread::sleep` is too coarse.
#[inline]
pub fn spin_for(d: Duration) {
    let until = Instant::now() + d;
    while Instant::now() < until {
        std::hint::spin_loop();
    }
}
