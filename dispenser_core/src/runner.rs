//! Long-running control loop around `DispenseController::step`.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::controller::DispenseController;
use crate::error::DispenserError;
use crate::status::StepOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub cycles: u64,
    pub errors: u64,
    /// Loop ended because of a shutdown request.
    pub interrupted: bool,
}

fn is_interrupt(e: &eyre::Report) -> bool {
    matches!(
        e.downcast_ref::<DispenserError>(),
        Some(DispenserError::Interrupted)
    )
}

/// Step `controller` until `shutdown` is set or `max_cycles` dispense cycles
/// have completed.
///
/// Errors from a single iteration are logged and the loop continues; the
/// controller has already returned itself to `Idle`.
pub fn run(
    controller: &mut DispenseController,
    shutdown: &AtomicBool,
    max_cycles: Option<u64>,
) -> RunSummary {
    let mut summary = RunSummary::default();
    info!(max_cycles = ?max_cycles, "dispenser ready");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("shutdown requested, leaving control loop");
            summary.interrupted = true;
            break;
        }
        summary.iterations = summary.iterations.saturating_add(1);
        match controller.step() {
            Ok(StepOutcome::Completed(cycle)) => {
                summary.cycles = summary.cycles.saturating_add(1);
                info!(
                    cycle = summary.cycles,
                    pir_time = cycle.record.gesture_ms,
                    user_review = cycle.record.review.as_str(),
                    angle_deg = cycle.angle_deg,
                    "dispense cycle complete"
                );
                if max_cycles.is_some_and(|max| summary.cycles >= max) {
                    info!("cycle limit reached");
                    break;
                }
            }
            Ok(_) => {}
            Err(e) if is_interrupt(&e) => {
                info!("cycle interrupted by shutdown request");
                summary.interrupted = true;
                break;
            }
            Err(e) => {
                summary.errors = summary.errors.saturating_add(1);
                warn!(error = format!("{e:#}"), "control loop iteration failed, continuing");
            }
        }
    }
    summary
}
