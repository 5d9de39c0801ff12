//! Maps `Box<dyn Error>` from trait boundaries to typed `DispenserError`.
//!
//! The traits in `dispenser_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with a feature-gated path for `dispenser_hardware::HwError` downcasting.

use crate::error::DispenserError;

/// Map a trait-boundary error to a typed `DispenserError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> DispenserError {
    #[cfg(feature = "hardware-errors")]
    {
        use dispenser_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::EchoTimeout => DispenserError::Timeout,
                other => DispenserError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        DispenserError::Timeout
    } else {
        DispenserError::Hardware(s)
    }
}
