use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DispenserError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
    #[error("report delivery error: {0}")]
    Report(String),
    #[error("interrupted by stop request")]
    Interrupted,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing range sensor")]
    MissingRangeSensor,
    #[error("missing motion sensor")]
    MissingMotionSensor,
    #[error("missing actuator")]
    MissingActuator,
    #[error("missing review buttons")]
    MissingButtons,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
