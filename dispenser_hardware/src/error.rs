use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("echo pulse timeout")]
    EchoTimeout,
    #[error("servo angle out of range: {0}")]
    InvalidAngle(f32),
}

pub type Result<T> = std::result::Result<T, HwError>;
