//! Config mapping, controller assembly, and the `run` / `self-check` commands.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dispenser_core::{
    DispenseController, LogSink, Reporter, ReporterStats, Review, RunSummary, map_hw_error,
};
use eyre::WrapErr;

use crate::devices;

const COLLECTOR_RETRY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub reports: ReporterStats,
}

fn build_reporter(cfg: &dispenser_config::Reporter) -> eyre::Result<Reporter> {
    if !cfg.enabled {
        tracing::info!("reporting disabled, records go to the log");
        return Ok(Reporter::spawn(LogSink, cfg.queue_depth));
    }
    let sink = dispenser_core::HttpSink::new(cfg.url(), Duration::from_millis(cfg.timeout_ms))
        .wrap_err("create HTTP client")?;
    tracing::info!(url = sink.url(), "reporting to collector");
    Ok(Reporter::spawn(sink, cfg.queue_depth))
}

/// Block until the collector accepts a TCP connection or shutdown is requested.
fn wait_for_collector(cfg: &dispenser_config::Reporter, shutdown: &AtomicBool) {
    let target = format!("{}:{}", cfg.host, cfg.port);
    tracing::info!(collector = %target, "waiting for collector");
    let mut attempts = 0u64;
    while !shutdown.load(Ordering::Relaxed) {
        attempts += 1;
        let reachable = target
            .to_socket_addrs()
            .ok()
            .into_iter()
            .flatten()
            .any(|addr| TcpStream::connect_timeout(&addr, COLLECTOR_RETRY).is_ok());
        if reachable {
            tracing::info!(attempts, "collector reachable");
            return;
        }
        tracing::debug!(attempts, "collector not reachable yet");
        std::thread::sleep(COLLECTOR_RETRY);
    }
}

pub fn run_dispenser(
    cfg: &dispenser_config::Config,
    cycles: Option<u64>,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunOutcome> {
    let rig = devices::assemble(cfg)?;
    let reporter = build_reporter(&cfg.reporter)?;
    if cfg.reporter.enabled && cfg.reporter.wait_for_collector {
        wait_for_collector(&cfg.reporter, &shutdown);
    }

    let stop = shutdown.clone();
    let mut controller = DispenseController::builder()
        .with_range_sensor(rig.range)
        .with_motion_sensor(rig.motion)
        .with_actuator(rig.actuator)
        .with_buttons(rig.buttons)
        .with_detection((&cfg.detection).into())
        .with_dispense((&cfg.dispense).into())
        .with_extra((&cfg.extra).into())
        .with_feedback((&cfg.feedback).into())
        .with_cooldown((&cfg.cooldown).into())
        .with_reporter(reporter)
        .with_stop_check(move || stop.load(Ordering::Relaxed))
        .build()?;

    let summary = dispenser_core::run(&mut controller, &shutdown, cycles);
    // Flush queued records before reporting totals.
    let reports = controller
        .into_reporter()
        .map(Reporter::shutdown)
        .unwrap_or_default();
    tracing::info!(
        cycles = summary.cycles,
        errors = summary.errors,
        delivered = reports.delivered,
        failed = reports.failed,
        dropped = reports.dropped,
        "dispenser stopped"
    );
    Ok(RunOutcome { summary, reports })
}

#[derive(Debug, Clone, Copy)]
pub struct SelfCheck {
    pub distance_cm: f32,
    pub motion: bool,
    pub pressed: Option<Review>,
}

pub fn self_check(cfg: &dispenser_config::Config) -> eyre::Result<SelfCheck> {
    let mut rig = devices::assemble(cfg)?;
    let hw = |e: dispenser_traits::DeviceError| eyre::Report::new(map_hw_error(&*e));
    let distance_cm = rig.range.distance_cm().map_err(hw).wrap_err("read range sensor")?;
    let motion = rig.motion.is_active().map_err(hw).wrap_err("read motion sensor")?;
    let levels = rig.buttons.read().map_err(hw).wrap_err("read review buttons")?;
    rig.actuator
        .set_angle(dispenser_core::REST_ANGLE_DEG)
        .map_err(hw)
        .wrap_err("park servo")?;
    Ok(SelfCheck {
        distance_cm,
        motion,
        pressed: Review::from_levels(levels),
    })
}
