//! Outcome of a single control-loop iteration.

use std::time::Duration;

use crate::report::InteractionRecord;
use crate::state::{DetectionState, GestureTiming};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Detection is locked out after a recent cycle.
    CoolingDown,
    /// This iteration ended the cooldown.
    Reenabled,
    /// Nothing changed; still in the given state.
    Waiting(DetectionState),
    Transition {
        from: DetectionState,
        to: DetectionState,
    },
    /// A full dispense cycle ran during this iteration.
    Completed(CycleReport),
}

/// Result of the slow extra-feed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraOutcome {
    Disabled,
    /// Hand was gone at the re-check.
    NotNeeded,
    /// `steps` angles were commanded; `withdrawn` is true when the hand left
    /// before the travel limit.
    Fed { steps: u32, withdrawn: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub record: InteractionRecord,
    pub timing: GestureTiming,
    pub gesture: Duration,
    pub length_inches: f32,
    pub angle_deg: f32,
    pub extra: ExtraOutcome,
}
