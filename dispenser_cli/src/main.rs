mod cli;
mod devices;
mod dispense;
mod error_fmt;
mod logging;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE, json_mode};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        if json_mode() {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("error: {err:#}\n\n{}", humanize(&err));
        }
        tracing::error!(error = format!("{err:#}"), "dispenser failed");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = dispenser_config::load_file(&cli.config)
        .wrap_err_with(|| format!("invalid configuration in {}", cli.config.display()))?;
    logging::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.cmd {
        Commands::Run { cycles } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }

            let outcome = dispense::run_dispenser(&cfg, cycles, shutdown)?;
            if json_mode() {
                println!(
                    "{}",
                    serde_json::json!({
                        "cycles": outcome.summary.cycles,
                        "errors": outcome.summary.errors,
                        "interrupted": outcome.summary.interrupted,
                        "delivered": outcome.reports.delivered,
                        "failed": outcome.reports.failed,
                        "dropped": outcome.reports.dropped,
                    })
                );
            } else {
                println!(
                    "completed {} cycles ({} errors, {} reports delivered)",
                    outcome.summary.cycles, outcome.summary.errors, outcome.reports.delivered
                );
            }
        }
        Commands::SelfCheck => {
            let check = dispense::self_check(&cfg)?;
            let pressed = check.pressed.map(|r| r.as_str());
            if json_mode() {
                println!(
                    "{}",
                    serde_json::json!({
                        "distance_cm": if check.distance_cm.is_finite() { Some(check.distance_cm) } else { None },
                        "motion": check.motion,
                        "pressed": pressed,
                    })
                );
            } else {
                println!(
                    "self-check ok: distance_cm={} motion={} pressed={}",
                    check.distance_cm,
                    check.motion,
                    pressed.unwrap_or("none")
                );
            }
        }
    }
    Ok(())
}
