//! Headless Wa-Tor runner.
//!
//! Usage: `wator-runner [config.json]`. Without a path the default
//! configuration is used; `WATOR_THREADS` overrides the thread count.

mod runner;
mod telemetry;

use anyhow::{Context, Result};
use tracing::info;
use wator_core::RunConfig;

fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::load(&path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => RunConfig::default(),
    }
    .with_env_overrides()?;
    config.validate()?;

    info!(
        grid = format!("{}x{}", config.world.width, config.world.height),
        fish = config.world.num_fish,
        sharks = config.world.num_sharks,
        fish_breed = config.world.fish_breed,
        shark_breed = config.world.shark_breed,
        starve = config.world.shark_starve,
        threads = config.threads,
        max_steps = config.max_steps,
        "Wa-Tor simulation"
    );

    match &config.benchmark {
        Some(benchmark) => {
            let runs = runner::benchmark(&config.world, benchmark)?;
            for line in runner::benchmark_report(&runs) {
                println!("{}", line);
            }
        }
        None => {
            let summary = runner::simulate(&config)?;
            for line in summary.report() {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
