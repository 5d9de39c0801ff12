//! Device seams shared by the dispenser controller and its hardware backends.
//!
//! Every boundary returns `Box<dyn Error + Send + Sync>` so backends are free
//! to use their own error types; the core maps them to typed errors.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// Single-shot distance measurement (ultrasonic rangefinder).
pub trait RangeSensor {
    /// Distance in centimeters. A missing echo reads as `f32::INFINITY`.
    fn distance_cm(&mut self) -> Result<f32, DeviceError>;
}

/// Binary motion input (PIR output line).
pub trait MotionSensor {
    /// True while the line reads HIGH.
    fn is_active(&mut self) -> Result<bool, DeviceError>;
}

/// Open-loop positional actuator (feed servo).
pub trait Actuator {
    /// Command an absolute angle in degrees, 0..=180. Returns once the command is issued.
    fn set_angle(&mut self, degrees: f32) -> Result<(), DeviceError>;
}

/// Snapshot of the three review buttons. `true` means pressed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLevels {
    pub satisfactory: bool,
    pub less: bool,
    pub more: bool,
}

impl ButtonLevels {
    pub fn any(&self) -> bool {
        self.satisfactory || self.less || self.more
    }
}

/// Non-blocking reader for the review buttons.
pub trait ReviewButtons {
    fn read(&mut self) -> Result<ButtonLevels, DeviceError>;
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn distance_cm(&mut self) -> Result<f32, DeviceError> {
        (**self).distance_cm()
    }
}

impl<T: MotionSensor + ?Sized> MotionSensor for Box<T> {
    fn is_active(&mut self) -> Result<bool, DeviceError> {
        (**self).is_active()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set_angle(&mut self, degrees: f32) -> Result<(), DeviceError> {
        (**self).set_angle(degrees)
    }
}

impl<T: ReviewButtons + ?Sized> ReviewButtons for Box<T> {
    fn read(&mut self) -> Result<ButtonLevels, DeviceError> {
        (**self).read()
    }
}
