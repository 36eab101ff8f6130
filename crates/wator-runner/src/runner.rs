//! Simulation and benchmark loops.

use anyhow::Result;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use wator_core::{BenchmarkConfig, RunConfig, Species, WorldConfig};
use wator_world::{Population, World};

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    StepLimit,
    FishExtinct,
    SharksExtinct,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::StepLimit => "step limit reached",
            EndReason::FishExtinct => "all fish died",
            EndReason::SharksExtinct => "all sharks died",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub threads: usize,
    pub steps: u64,
    pub population: Population,
    pub total_eaten: u64,
    pub elapsed: Duration,
    pub end: EndReason,
}

impl RunSummary {
    pub fn average_step(&self) -> Option<Duration> {
        u32::try_from(self.steps)
            .ok()
            .filter(|&steps| steps > 0)
            .map(|steps| self.elapsed / steps)
    }

    pub fn report(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Simulation completed at step {} ({})", self.steps, self.end),
            format!(
                "Final populations - Fish: {}, Sharks: {}",
                self.population.fish, self.population.sharks
            ),
            format!("Total fish eaten: {}", self.total_eaten),
            format!("Total execution time: {:?}", self.elapsed),
        ];
        if let Some(average) = self.average_step() {
            lines.push(format!("Average time per step: {:?}", average));
        }
        lines
    }
}

/// Run one simulation as configured
pub fn simulate(config: &RunConfig) -> Result<RunSummary> {
    let mut world = World::create(config.world.clone())?;
    Ok(run(
        &mut world,
        config.threads,
        config.max_steps,
        config.report_interval,
    ))
}

/// Step `world` until `max_steps` (0 = no limit) or until a species dies out
pub fn run(
    world: &mut World,
    threads: usize,
    max_steps: u64,
    report_interval: u64,
) -> RunSummary {
    let start = Instant::now();

    let end = loop {
        match world.count().extinct() {
            Some(Species::Fish) => break EndReason::FishExtinct,
            Some(_) => break EndReason::SharksExtinct,
            None => {}
        }
        if max_steps > 0 && world.chronon() >= max_steps {
            break EndReason::StepLimit;
        }

        world.step(threads);

        if report_interval > 0 && world.chronon() % report_interval == 0 {
            let population = world.count();
            info!(
                step = world.chronon(),
                fish = population.fish,
                sharks = population.sharks,
                total = population.total(),
                fish_eaten = world.total_eaten(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Population snapshot"
            );
        }
    };

    let summary = RunSummary {
        threads,
        steps: world.chronon(),
        population: world.count(),
        total_eaten: world.total_eaten(),
        elapsed: start.elapsed(),
        end,
    };

    info!(
        step = summary.steps,
        fish = summary.population.fish,
        sharks = summary.population.sharks,
        fish_eaten = summary.total_eaten,
        reason = %summary.end,
        "Simulation ended"
    );

    summary
}

/// Time the same seeded world once per configured thread count
pub fn benchmark(config: &WorldConfig, benchmark: &BenchmarkConfig) -> Result<Vec<RunSummary>> {
    benchmark
        .thread_counts
        .iter()
        .map(|&threads| -> Result<RunSummary> {
            debug!(threads, steps = benchmark.steps, "Benchmark run");
            let mut world = World::create(config.clone())?;
            Ok(run(&mut world, threads, benchmark.steps, 0))
        })
        .collect()
}

/// One line per run, with speedup relative to the first run
pub fn benchmark_report(runs: &[RunSummary]) -> Vec<String> {
    let baseline = runs.first().map(|run| run.elapsed.as_secs_f64());

    runs.iter()
        .map(|run| {
            let seconds = run.elapsed.as_secs_f64();
            let speedup = match baseline {
                Some(base) if seconds > 0.0 => base / seconds,
                _ => 1.0,
            };
            format!(
                "Threads: {} | Steps: {} | Execution Time: {:.3}ms | Speedup: {:.2}x",
                run.threads,
                run.steps,
                seconds * 1000.0,
                speedup
            )
        })
        .collect()
}
