//! Device backends for the dispenser: Raspberry Pi GPIO drivers behind the
//! `hardware` feature, and scripted simulated devices otherwise.

pub mod error;
pub mod sim;
pub mod util;

#[cfg(feature = "hardware")]
pub mod gpio;

pub use sim::{
    SceneCfg, SharedScene, SimScene, SimulatedButtons, SimulatedMotionSensor,
    SimulatedRangeSensor, SimulatedServo, simulated_rig,
};

#[cfg(feature = "hardware")]
pub use gpio::{GpioButtons, GpioServo, HcSr04, PirSensor};
