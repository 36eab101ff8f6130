//! The long-lived simulation world.

use crate::grid::{Grid, Population};
use crate::rules::{Rules, StepOutcome};
use crate::scheduler::{run_step, Strategy};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};
use wator_core::{Error, Result, WorldConfig};

/// Owns the live grid and advances it one chronon at a time.
///
/// Each step builds a fresh grid from the current one and replaces it, so
/// callers only ever observe whole generations.
pub struct World {
    grid: Grid,
    rules: Rules,
    config: WorldConfig,
    rng: ChaCha8Rng,
    chronon: u64,
    total_eaten: u64,
}

impl World {
    /// Create a world with randomly placed fish and sharks
    pub fn create(config: WorldConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let grid = Grid::from_config(&config, &mut rng);

        info!(
            width = config.width,
            height = config.height,
            fish = config.num_fish,
            sharks = config.num_sharks,
            fish_breed = config.fish_breed,
            shark_breed = config.shark_breed,
            shark_starve = config.shark_starve,
            seed = config.seed,
            "Created world"
        );

        Ok(Self::assemble(config, grid, rng))
    }

    /// Wrap an already populated grid.
    ///
    /// The population counts in `config` are replaced by what `grid` holds;
    /// its dimensions must match.
    pub fn from_grid(mut config: WorldConfig, grid: Grid) -> Result<Self> {
        if grid.width != config.width || grid.height != config.height {
            return Err(Error::Validation(format!(
                "grid is {}x{} but configuration expects {}x{}",
                grid.width, grid.height, config.width, config.height
            )));
        }

        let population = grid.count();
        config.num_fish = population.fish;
        config.num_sharks = population.sharks;
        config.validate()?;

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self::assemble(config, grid, rng))
    }

    fn assemble(config: WorldConfig, grid: Grid, rng: ChaCha8Rng) -> Self {
        Self {
            grid,
            rules: Rules::from(&config),
            config,
            rng,
            chronon: 0,
            total_eaten: 0,
        }
    }

    /// Advance one chronon and report everything that happened.
    ///
    /// `threads` of 0 or 1 runs sequentially; more splits each phase across
    /// that many workers.
    #[instrument(level = "trace", skip(self), fields(chronon = self.chronon))]
    pub fn advance(&mut self, threads: usize) -> StepOutcome {
        let strategy = Strategy::from_threads(threads);
        let (next, outcome) = run_step(&self.grid, &self.rules, strategy, &mut self.rng);

        self.grid = next;
        self.chronon += 1;
        self.total_eaten += outcome.fish_eaten as u64;

        debug!(
            chronon = self.chronon,
            fish_eaten = outcome.fish_eaten,
            fish_born = outcome.fish_born,
            sharks_born = outcome.sharks_born,
            sharks_starved = outcome.sharks_starved,
            "Step complete"
        );

        outcome
    }

    /// Advance one chronon, returning the number of fish eaten
    pub fn step(&mut self, threads: usize) -> usize {
        self.advance(threads).fish_eaten
    }

    /// Current fish and shark totals
    pub fn count(&self) -> Population {
        self.grid.count()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Completed steps
    pub fn chronon(&self) -> u64 {
        self.chronon
    }

    /// Fish eaten since the world was created
    pub fn total_eaten(&self) -> u64 {
        self.total_eaten
    }
}
