//! # GRIDLINK Server
//!
//! Headless simulation server. Builds the demo world and drives it at the
//! configured tick rate.
//!
//! ```bash
//! # Defaults, run until killed
//! gridlink_server
//!
//! # Custom config, stop after one simulated minute at 20 Hz
//! RUST_LOG=gridlink_networking=debug gridlink_server --config gridlink.toml --ticks 1200
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use gridlink::core::TickDriver;
use gridlink::{Demo, ServerConfig};

/// GRIDLINK - in-game network simulation server.
#[derive(Parser)]
#[command(name = "gridlink_server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks instead of running forever.
    #[arg(short, long)]
    ticks: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    tracing::info!(
        tick_rate = config.tick.tick_rate,
        seed = config.network.seed,
        "starting gridlink server"
    );

    let demo = Demo::build(config.network.clone(), &config.demo)
        .context("failed to build demo world")?;

    let mut driver = TickDriver::new(&config.tick, demo);
    driver.add_action("world", |demo, _tick| {
        demo.world.tick();
        Ok(())
    });
    driver.add_action("client", |demo, _tick| Ok(demo.drive_client()?));

    match cli.ticks {
        Some(ticks) => driver.run_for(ticks),
        None => driver.run(),
    }

    let timing = *driver.stats();
    let demo = driver.into_state();
    let traffic = demo.world.stats();
    tracing::info!(
        ticks = timing.total_ticks,
        avg_tick_us = timing.avg_tick_us,
        max_tick_us = timing.max_tick_us,
        late_ticks = timing.late_ticks,
        failed_actions = timing.failed_actions,
        "tick driver finished"
    );
    tracing::info!(
        routed = traffic.packets_routed,
        delivered = traffic.packets_delivered,
        dropped = traffic.packets_dropped,
        sessions = demo.sessions_opened(),
        pings = demo.pings_sent(),
        echoes = demo.echoes_received(),
        "network summary"
    );

    Ok(())
}
