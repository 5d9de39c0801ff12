#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core dispenser logic (hardware-agnostic).
//!
//! All device access goes through the `dispenser_traits` seams, and all
//! delays go through an injected `Clock`, so a complete cycle can be driven
//! deterministically in tests.
//!
//! ## Architecture
//!
//! - **State**: detection phases, gesture timestamps, cooldown gate (`state`)
//! - **Policy**: gesture duration to paper length to feed angle (`policy`)
//! - **Controller**: one poll per `step`, full cycle on gesture end (`controller`)
//! - **Feedback**: button priority and the blocking review wait (`feedback`)
//! - **Reporting**: records, sinks, background delivery worker (`report`)
//! - **Runner**: the long-running loop with shutdown and cycle limit (`runner`)

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod feedback;
pub mod hw_error;
#[cfg(feature = "http")]
pub mod http_sink;
pub mod mocks;
pub mod policy;
pub mod report;
pub mod runner;
pub mod state;
pub mod status;

pub use builder::{DispenserBuilder, Missing, Set};
pub use config::{
    CooldownCfg, DetectionCfg, DispenseCfg, ExtraDispenseCfg, FeedbackCfg, MIN_EXTRA_STEP_DEG,
    REST_ANGLE_DEG,
};
pub use controller::DispenseController;
pub use error::{BuildError, DispenserError, Result};
pub use feedback::{Review, wait_for_review};
pub use hw_error::map_hw_error;
#[cfg(feature = "http")]
pub use http_sink::HttpSink;
pub use policy::{MAX_EXTRA_STEPS, convert_to_angle, extra_step_angles, required_length_inches};
pub use report::{InteractionRecord, LogSink, RecordSink, Reporter, ReporterStats};
pub use runner::{RunSummary, run};
pub use state::{CooldownGate, DetectionState, GestureTiming};
pub use status::{CycleReport, ExtraOutcome, StepOutcome};
