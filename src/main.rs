//! gncsim - fault-tolerant sensor-to-actuator pipeline simulator
//!
//! # Usage
//!
//! ```bash
//! # One cycle, direct sensor-to-controller wiring
//! cargo run --release
//!
//! # Triple Modular Redundancy with injected stuck-at faults
//! cargo run --release -- --tmr --inject-faults
//!
//! # Log to a file instead of stderr
//! cargo run --release -- --log-file run.log
//! ```
//!
//! # Environment Variables
//!
//! - `GNCSIM_CONFIG`: path to a TOML run configuration
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use gncsim::channel::ChannelBus;
use gncsim::config::RunConfig;
use gncsim::control_law::RandomOffsetLaw;
use gncsim::pipeline::Orchestrator;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "gncsim")]
#[command(about = "Fault-tolerant sensor-to-actuator control-loop simulator")]
#[command(version)]
struct CliArgs {
    /// Enable Triple Modular Redundancy: three replicas per sensor class,
    /// adjudicated by a per-class 2-of-3 voter
    #[arg(short = 't', long)]
    tmr: bool,

    /// Inject stuck-at faults into replicas 0 and 1 of each sensor class
    #[arg(short = 'i', long)]
    inject_faults: bool,

    /// Redirect log output to a file (appended) instead of stderr
    #[arg(short = 'f', long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Path to a TOML run configuration (overrides GNCSIM_CONFIG)
    #[arg(long, env = "GNCSIM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_file.as_ref())?;

    let mut config = RunConfig::load(args.config.as_deref()).context("loading configuration")?;
    // CLI flags override whatever the file said.
    config.tmr_enabled |= args.tmr;
    config.inject_faults |= args.inject_faults;

    info!(
        tmr = config.tmr_enabled,
        inject_faults = config.inject_faults,
        sensors = config.sensors.total(),
        actuators = config.actuators,
        "starting pipeline"
    );

    let bus = ChannelBus::new(config.namespace.clone(), config.channel_capacity);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("ctrl-c received, shutting down");
        shutdown.cancel();
    });

    let stats = Orchestrator::new(config, bus)
        .run(Box::new(RandomOffsetLaw), cancel)
        .await;

    info!(
        completed = stats.one_shots_completed,
        failed = stats.one_shot_failures,
        terminations = stats.terminations_sent,
        "pipeline run finished"
    );
    Ok(())
}
