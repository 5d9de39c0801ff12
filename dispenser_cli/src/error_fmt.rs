//! Human-readable error descriptions, exit codes, and structured JSON errors.

use dispenser_core::error::{BuildError, DispenserError};

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_CONFIG: i32 = 3;
pub const EXIT_HARDWARE: i32 = 4;

fn is_config_error(err: &eyre::Report) -> bool {
    if matches!(err.downcast_ref::<BuildError>(), Some(BuildError::InvalidConfig(_))) {
        return true;
    }
    err.chain().any(|e| {
        let lower = e.to_string().to_ascii_lowercase();
        lower.contains("invalid configuration") || lower.contains("read config")
    })
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRangeSensor
            | BuildError::MissingMotionSensor
            | BuildError::MissingActuator
            | BuildError::MissingButtons => format!(
                "What happened: The controller was started without a device ({be}).\nLikely causes: A device failed to initialize or was not wired into the builder.\nHow to fix: Check the startup log for the device that failed and its [pins] entry."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/dispenser.toml for a sample."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DispenserError>() {
        return match de {
            DispenserError::Timeout => "What happened: A sensor read timed out.\nLikely causes: Ultrasonic sensor not wired correctly or without power.\nHow to fix: Verify the trig/echo pins and 5V/GND, or raise hardware.echo_timeout_ms.".to_string(),
            DispenserError::Hardware(_) | DispenserError::HardwareFault(_) => format!(
                "What happened: Hardware access failed ({de}).\nLikely causes: Incorrect pin numbers, missing GPIO permissions, or a device that is not connected.\nHow to fix: Fix the [pins] values in the config and ensure the process may access /dev/gpiomem."
            ),
            DispenserError::Report(_) => format!(
                "What happened: Review reporting could not be set up ({de}).\nLikely causes: The HTTP client failed to initialize.\nHow to fix: Set reporter.enabled = false to run without a collector, or check the [reporter] section."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if is_config_error(err) {
        return format!(
            "What happened: Configuration is invalid or unreadable.\nLikely causes: {}.\nHow to fix: Edit the TOML config (or pass --config) and try again.",
            err.root_cause()
        );
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for configuration, 4 for hardware, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if is_config_error(err) {
        return EXIT_CONFIG;
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_HARDWARE;
    }
    match err.downcast_ref::<DispenserError>() {
        Some(DispenserError::Hardware(_) | DispenserError::HardwareFault(_) | DispenserError::Timeout) => {
            EXIT_HARDWARE
        }
        _ => EXIT_GENERIC,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if is_config_error(err) {
        return "Config";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<DispenserError>() {
        Some(DispenserError::Timeout) => "Timeout",
        Some(DispenserError::Hardware(_) | DispenserError::HardwareFault(_)) => "Hardware",
        Some(DispenserError::Report(_)) => "Report",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
