//! Configuration types for the simulation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable that overrides [`RunConfig::threads`]
pub const THREADS_ENV: &str = "WATOR_THREADS";

/// World configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the world grid
    pub width: i32,
    /// Height of the world grid
    pub height: i32,
    /// Initial number of fish
    pub num_fish: usize,
    /// Initial number of sharks
    pub num_sharks: usize,
    /// Chronons a fish must survive before it breeds
    pub fish_breed: i32,
    /// Chronons a shark must survive before it breeds
    pub shark_breed: i32,
    /// Maximum shark energy; also the energy granted by a meal
    pub shark_starve: i32,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 80,
            num_fish: 500,
            num_sharks: 100,
            fish_breed: 10,
            shark_breed: 10,
            shark_starve: 8,
            seed: 0,
        }
    }
}

impl WorldConfig {
    /// Number of cells in the grid, if it is addressable
    pub fn capacity(&self) -> Option<usize> {
        let cells = self.width.checked_mul(self.height)?;
        usize::try_from(cells).ok()
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("fish_breed", self.fish_breed),
            ("shark_breed", self.shark_breed),
            ("shark_starve", self.shark_starve),
        ];
        for (name, value) in positive {
            if value < 1 {
                return Err(Error::Validation(format!(
                    "{} must be at least 1, got {}",
                    name, value
                )));
            }
        }

        let capacity = self.capacity().ok_or_else(|| {
            Error::Validation(format!(
                "grid of {}x{} cells is too large",
                self.width, self.height
            ))
        })?;

        let population = self.num_fish.checked_add(self.num_sharks);
        if population.map_or(true, |population| population > capacity) {
            return Err(Error::Validation(format!(
                "too many entities for grid size: {} fish + {} sharks > {} cells",
                self.num_fish, self.num_sharks, capacity
            )));
        }

        Ok(())
    }
}

/// Benchmark sweep over several thread counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Thread counts to time, in order; the first is the speedup baseline
    pub thread_counts: Vec<usize>,
    /// Steps per timed run
    pub steps: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            thread_counts: vec![1, 2, 4, 8],
            steps: 1000,
        }
    }
}

/// Headless run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// World parameters
    pub world: WorldConfig,
    /// Worker threads per step (1 = sequential)
    pub threads: usize,
    /// Number of simulation steps (0 = until a species dies out)
    pub max_steps: u64,
    /// Steps between population snapshots in the log
    pub report_interval: u64,
    /// Run a thread-count sweep instead of a single simulation
    pub benchmark: Option<BenchmarkConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            threads: 1,
            max_steps: 0,
            report_interval: 100,
            benchmark: None,
        }
    }
}

impl RunConfig {
    /// Load a run configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading run configuration");
        let text = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        match std::env::var(THREADS_ENV) {
            Ok(value) => self.with_threads_override(&value),
            Err(_) => Ok(self),
        }
    }

    fn with_threads_override(mut self, value: &str) -> Result<Self> {
        self.threads = value.trim().parse().map_err(|_| {
            Error::Validation(format!(
                "{} must be a positive integer, got {:?}",
                THREADS_ENV, value
            ))
        })?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.world.validate()?;

        if self.threads < 1 {
            return Err(Error::Validation("threads must be at least 1".to_string()));
        }

        if let Some(benchmark) = &self.benchmark {
            if benchmark.thread_counts.is_empty() {
                return Err(Error::Validation(
                    "benchmark needs at least one thread count".to_string(),
                ));
            }
            if benchmark.thread_counts.contains(&0) {
                return Err(Error::Validation(
                    "benchmark thread counts must be at least 1".to_string(),
                ));
            }
        }

        Ok(())
    }
}
