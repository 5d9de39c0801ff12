#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the paper dispenser.
//!
//! Every section carries defaults equal to the stock firmware constants, so an
//! empty TOML document is a complete configuration. `Config::validate` rejects
//! values the controller cannot run with.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Pins {
    pub pir: u8,
    pub trig: u8,
    pub echo: u8,
    pub servo: u8,
    pub button_satisfactory: u8,
    pub button_less: u8,
    pub button_more: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            pir: 18,
            trig: 44,
            echo: 43,
            servo: 21,
            button_satisfactory: 2,
            button_less: 3,
            button_more: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Detection {
    /// A hand is present when the range reading is strictly below this (cm).
    pub distance_threshold_cm: f32,
    /// Delay after every control-loop iteration (ms).
    pub poll_ms: u64,
}

impl Default for Detection {
    fn default() -> Self {
        Self {
            distance_threshold_cm: 15.0,
            poll_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Dispense {
    /// Paper length per second of gesture.
    pub inches_per_second: f32,
    /// Feed rotation per inch of paper.
    pub degrees_per_inch: f32,
    /// Mechanical travel limit of the feed servo.
    pub max_angle_deg: f32,
    /// Hold time at the commanded angle before returning to rest (ms).
    pub settle_ms: u64,
}

impl Default for Dispense {
    fn default() -> Self {
        Self {
            inches_per_second: 1.0,
            degrees_per_inch: 100.0,
            max_angle_deg: 180.0,
            settle_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Extra {
    pub enabled: bool,
    /// Wait before re-checking presence (ms).
    pub check_delay_ms: u64,
    pub step_deg: f32,
    /// Pause after each step before re-sampling presence (ms).
    pub step_pause_ms: u64,
}

impl Default for Extra {
    fn default() -> Self {
        Self {
            enabled: true,
            check_delay_ms: 3000,
            step_deg: 10.0,
            step_pause_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Feedback {
    /// Button poll resolution (ms).
    pub poll_ms: u64,
}

impl Default for Feedback {
    fn default() -> Self {
        Self { poll_ms: 100 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cooldown {
    /// Detection lockout after a completed cycle (ms).
    pub period_ms: u64,
    /// Unconditional pause right after a cycle completes (ms). 0 disables.
    pub restart_delay_ms: u64,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self {
            period_ms: 5000,
            restart_delay_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// Upper bound on one echo measurement (ms).
    pub echo_timeout_ms: u64,
    pub sound_speed_cm_per_us: f32,
    pub servo_min_pulse_us: u64,
    pub servo_max_pulse_us: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            echo_timeout_ms: 30,
            sound_speed_cm_per_us: 0.034,
            servo_min_pulse_us: 500,
            servo_max_pulse_us: 2400,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Reporter {
    /// When false, records are logged locally instead of posted.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
    /// Records buffered for the background sender before new ones are dropped.
    pub queue_depth: usize,
    /// Block at startup until the collector accepts TCP connections.
    pub wait_for_collector: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "3.147.237.91".to_string(),
            port: 5000,
            path: "/review".to_string(),
            timeout_ms: 5000,
            queue_depth: 8,
            wait_for_collector: false,
        }
    }
}

impl Reporter {
    pub fn url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SimPress {
    #[default]
    Satisfactory,
    Less,
    More,
}

/// Scripted visitor used by the simulated backend.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sim {
    pub arrive_after_reads: u32,
    pub motion_delay_reads: u32,
    pub motion_reads: u32,
    pub near_cm: f32,
    pub far_cm: f32,
    pub press: SimPress,
}

impl Default for Sim {
    fn default() -> Self {
        Self {
            arrive_after_reads: 10,
            motion_delay_reads: 2,
            motion_reads: 5,
            near_cm: 8.0,
            far_cm: 60.0,
            press: SimPress::Satisfactory,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub detection: Detection,
    pub dispense: Dispense,
    pub extra: Extra,
    pub feedback: Feedback,
    pub cooldown: Cooldown,
    pub hardware: Hardware,
    pub reporter: Reporter,
    pub logging: Logging,
    pub sim: Sim,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

fn finite_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Detection
        if !finite_positive(self.detection.distance_threshold_cm) {
            eyre::bail!("detection.distance_threshold_cm must be > 0");
        }
        if self.detection.distance_threshold_cm > 400.0 {
            eyre::bail!("detection.distance_threshold_cm is beyond sensor range (>400cm)");
        }
        if self.detection.poll_ms > 10_000 {
            eyre::bail!("detection.poll_ms is unreasonably large (>10s)");
        }

        // Dispense
        if !self.dispense.inches_per_second.is_finite() || self.dispense.inches_per_second < 0.0 {
            eyre::bail!("dispense.inches_per_second must be >= 0");
        }
        if !finite_positive(self.dispense.degrees_per_inch) {
            eyre::bail!("dispense.degrees_per_inch must be > 0");
        }
        if !finite_positive(self.dispense.max_angle_deg) || self.dispense.max_angle_deg > 180.0 {
            eyre::bail!("dispense.max_angle_deg must be in (0.0, 180.0]");
        }
        if self.dispense.settle_ms > 60_000 {
            eyre::bail!("dispense.settle_ms is unreasonably large (>60s)");
        }

        // Extra dispense
        if !(1.0..=180.0).contains(&self.extra.step_deg) {
            eyre::bail!("extra.step_deg must be in [1.0, 180.0]");
        }
        if self.extra.check_delay_ms > 60_000 {
            eyre::bail!("extra.check_delay_ms is unreasonably large (>60s)");
        }

        // Feedback
        if self.feedback.poll_ms == 0 {
            eyre::bail!("feedback.poll_ms must be >= 1");
        }

        // Cooldown
        if self.cooldown.period_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("cooldown.period_ms is unreasonably large (>24h)");
        }

        // Hardware
        if self.hardware.echo_timeout_ms == 0 {
            eyre::bail!("hardware.echo_timeout_ms must be >= 1");
        }
        if !finite_positive(self.hardware.sound_speed_cm_per_us) {
            eyre::bail!("hardware.sound_speed_cm_per_us must be > 0");
        }
        if self.hardware.servo_min_pulse_us >= self.hardware.servo_max_pulse_us {
            eyre::bail!("hardware.servo_min_pulse_us must be < servo_max_pulse_us");
        }
        if self.hardware.servo_max_pulse_us > 20_000 {
            eyre::bail!("hardware.servo_max_pulse_us must fit in the 20ms PWM frame");
        }

        // Reporter
        if self.reporter.enabled {
            if self.reporter.host.trim().is_empty() {
                eyre::bail!("reporter.host must not be empty");
            }
            if self.reporter.port == 0 {
                eyre::bail!("reporter.port must be >= 1");
            }
            if !self.reporter.path.starts_with('/') {
                eyre::bail!("reporter.path must start with '/'");
            }
        }
        if self.reporter.timeout_ms == 0 {
            eyre::bail!("reporter.timeout_ms must be >= 1");
        }
        if self.reporter.queue_depth == 0 {
            eyre::bail!("reporter.queue_depth must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
