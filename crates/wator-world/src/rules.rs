//! Movement, feeding, breeding and starvation for a single fish or shark.
//!
//! Every rule reads the previous generation (`old`) and writes into the
//! [`Generation`] being built. Candidate destinations are filtered through
//! the generation's claim mask so no cell is written twice in one step.

use crate::grid::{ClaimMask, Grid};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;
use wator_core::{Cell, Position, Species, WorldConfig};

/// The grid under construction for the next chronon, plus its claim mask
#[derive(Debug, Clone)]
pub struct Generation {
    grid: Grid,
    claims: ClaimMask,
}

impl Generation {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            grid: Grid::new(width, height),
            claims: ClaimMask::new(width, height),
        }
    }

    pub fn claims(&self) -> &ClaimMask {
        &self.claims
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Write `cell` at `pos` and claim it
    pub fn write(&mut self, pos: Position, cell: Cell) {
        let fresh = self.claims.claim(pos);
        debug_assert!(fresh, "cell {} written twice in one step", pos);
        self.grid.set(pos, cell);
    }

    pub fn into_grid(self) -> Grid {
        self.grid
    }
}

/// What happened to one entity during a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityOutcome {
    pub ate: bool,
    pub bred: bool,
    pub starved: bool,
}

/// Aggregate events of one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub fish_eaten: usize,
    pub fish_born: usize,
    pub sharks_born: usize,
    pub sharks_starved: usize,
}

impl StepOutcome {
    pub fn record_shark(&mut self, outcome: EntityOutcome) {
        self.fish_eaten += outcome.ate as usize;
        self.sharks_born += outcome.bred as usize;
        self.sharks_starved += outcome.starved as usize;
    }

    pub fn record_fish(&mut self, outcome: EntityOutcome) {
        self.fish_born += outcome.bred as usize;
    }

    pub fn merge(&mut self, other: StepOutcome) {
        self.fish_eaten += other.fish_eaten;
        self.fish_born += other.fish_born;
        self.sharks_born += other.sharks_born;
        self.sharks_starved += other.sharks_starved;
    }
}

/// Per-run thresholds that drive the entity rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    pub fish_breed: i32,
    pub shark_breed: i32,
    pub shark_starve: i32,
}

impl From<&WorldConfig> for Rules {
    fn from(config: &WorldConfig) -> Self {
        Self {
            fish_breed: config.fish_breed,
            shark_breed: config.shark_breed,
            shark_starve: config.shark_starve,
        }
    }
}

impl Rules {
    /// Advance the shark at `origin`.
    ///
    /// A shark eats an adjacent unclaimed fish if there is one, otherwise
    /// moves to an adjacent unclaimed empty cell, otherwise stays. It dies
    /// when its energy runs out, whatever it found. A surviving shark whose
    /// breed timer reached the threshold leaves a newborn at `origin`.
    pub fn advance_shark<R: Rng + ?Sized>(
        &self,
        old: &Grid,
        origin: Position,
        next: &mut Generation,
        rng: &mut R,
    ) -> EntityOutcome {
        let Cell::Shark {
            mut breed_timer,
            mut energy,
        } = *old.get(origin)
        else {
            return EntityOutcome::default();
        };

        energy -= 1;
        breed_timer += 1;
        let starving = energy <= 0;

        let mut outcome = EntityOutcome::default();
        let destination = match old.neighbors(origin, Species::Fish, next.claims()).choose(rng) {
            Some(prey) => {
                energy = self.shark_starve;
                outcome.ate = true;
                prey
            }
            None => old
                .neighbors(origin, Species::Empty, next.claims())
                .choose(rng)
                .unwrap_or(origin),
        };

        if starving {
            trace!(origin = %origin, ate = outcome.ate, "Shark starved");
            outcome.starved = true;
            if destination != origin {
                next.write(destination, Cell::empty());
            }
            return outcome;
        }

        let newborn = Cell::shark(0, self.shark_starve);
        if breed_timer >= self.shark_breed {
            outcome.bred = spawn(next, origin, destination, newborn);
            breed_timer = 0;
        }

        next.write(destination, Cell::shark(breed_timer, energy));
        outcome
    }

    /// Advance the fish at `origin`: move to an adjacent unclaimed empty
    /// cell if there is one and breed at `origin` once the timer is due.
    pub fn advance_fish<R: Rng + ?Sized>(
        &self,
        old: &Grid,
        origin: Position,
        next: &mut Generation,
        rng: &mut R,
    ) -> EntityOutcome {
        let Cell::Fish { mut breed_timer } = *old.get(origin) else {
            return EntityOutcome::default();
        };

        breed_timer += 1;

        let destination = old
            .neighbors(origin, Species::Empty, next.claims())
            .choose(rng)
            .unwrap_or(origin);

        let mut outcome = EntityOutcome::default();
        if breed_timer >= self.fish_breed {
            outcome.bred = spawn(next, origin, destination, Cell::fish(0));
            breed_timer = 0;
        }

        next.write(destination, Cell::fish(breed_timer));
        outcome
    }
}

/// Leave `newborn` behind at `origin`. A parent that could not move would
/// land on its own offspring, so the birth is forfeited.
fn spawn(next: &mut Generation, origin: Position, destination: Position, newborn: Cell) -> bool {
    if destination == origin {
        return false;
    }
    next.write(origin, newborn);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const RULES: Rules = Rules {
        fish_breed: 3,
        shark_breed: 4,
        shark_starve: 5,
    };

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(11)
    }

    #[test]
    fn test_shark_eats_adjacent_fish() {
        let mut old = Grid::new(4, 4);
        old.set(Position::new(0, 0), Cell::shark(0, 2));
        old.set(Position::new(1, 0), Cell::fish(0));

        let mut next = Generation::new(4, 4);
        let outcome = RULES.advance_shark(&old, Position::new(0, 0), &mut next, &mut rng());

        assert!(outcome.ate);
        assert!(!outcome.starved);
        assert_eq!(*next.grid().get(Position::new(1, 0)), Cell::shark(1, 5));
        assert!(next.grid().get(Position::new(0, 0)).is_empty());
        assert!(next.claims().is_claimed(Position::new(1, 0)));
    }

    #[test]
    fn test_shark_prefers_fish_over_empty() {
        let mut old = Grid::new(5, 5);
        let origin = Position::new(2, 2);
        old.set(origin, Cell::shark(0, 3));
        old.set(Position::new(2, 3), Cell::fish(1));

        for seed in 0..20 {
            let mut next = Generation::new(5, 5);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let outcome = RULES.advance_shark(&old, origin, &mut next, &mut rng);
            assert!(outcome.ate);
            assert_eq!(next.grid().get(Position::new(2, 3)).species(), Species::Shark);
        }
    }

    #[test]
    fn test_shark_skips_claimed_fish() {
        let mut old = Grid::new(5, 5);
        let origin = Position::new(2, 2);
        old.set(origin, Cell::shark(0, 3));
        old.set(Position::new(2, 3), Cell::fish(1));

        let mut next = Generation::new(5, 5);
        next.write(Position::new(2, 3), Cell::shark(0, 5));

        let outcome = RULES.advance_shark(&old, origin, &mut next, &mut rng());
        assert!(!outcome.ate);
        assert_eq!(next.claims().claimed_count(), 2);
    }

    #[test]
    fn test_shark_starves_even_next_to_fish() {
        let mut old = Grid::new(4, 4);
        let origin = Position::new(1, 1);
        old.set(origin, Cell::shark(0, 1));
        old.set(Position::new(2, 1), Cell::fish(0));

        let mut next = Generation::new(4, 4);
        let outcome = RULES.advance_shark(&old, origin, &mut next, &mut rng());

        assert!(outcome.starved);
        assert!(outcome.ate);
        assert_eq!(next.grid().count().total(), 0);
        assert!(next.claims().is_claimed(Position::new(2, 1)));
        assert!(!next.claims().is_claimed(origin));
    }

    #[test]
    fn test_starving_shark_does_not_breed() {
        let mut old = Grid::new(4, 4);
        let origin = Position::new(1, 1);
        old.set(origin, Cell::shark(RULES.shark_breed, 1));

        let mut next = Generation::new(4, 4);
        let outcome = RULES.advance_shark(&old, origin, &mut next, &mut rng());

        assert!(outcome.starved);
        assert!(!outcome.bred);
        assert_eq!(next.grid().count().sharks, 0);
    }

    #[test]
    fn test_shark_breeds_at_origin() {
        let mut old = Grid::new(4, 4);
        let origin = Position::new(1, 1);
        old.set(origin, Cell::shark(RULES.shark_breed - 1, 5));

        let mut next = Generation::new(4, 4);
        let outcome = RULES.advance_shark(&old, origin, &mut next, &mut rng());

        assert!(outcome.bred);
        assert_eq!(*next.grid().get(origin), Cell::shark(0, RULES.shark_starve));
        let parent: Vec<_> = next
            .grid()
            .iter()
            .filter(|(pos, cell)| *pos != origin && !cell.is_empty())
            .collect();
        assert_eq!(parent.len(), 1);
        assert_eq!(*parent[0].1, Cell::shark(0, 4));
    }

    #[test]
    fn test_boxed_in_shark_stays_put() {
        let mut old = Grid::new(3, 3);
        for pos in old.positions().collect::<Vec<_>>() {
            old.set(pos, Cell::shark(0, 5));
        }
        let origin = Position::new(1, 1);
        old.set(origin, Cell::shark(RULES.shark_breed - 1, 3));

        let mut next = Generation::new(3, 3);
        let outcome = RULES.advance_shark(&old, origin, &mut next, &mut rng());

        assert_eq!(outcome, EntityOutcome::default());
        assert_eq!(*next.grid().get(origin), Cell::shark(0, 2));
        assert_eq!(next.claims().claimed_count(), 1);
    }

    #[test]
    fn test_fish_moves_to_empty_neighbor() {
        let mut old = Grid::new(4, 4);
        let origin = Position::new(2, 2);
        old.set(origin, Cell::fish(0));

        let mut next = Generation::new(4, 4);
        let outcome = RULES.advance_fish(&old, origin, &mut next, &mut rng());

        assert!(!outcome.bred);
        assert!(next.grid().get(origin).is_empty());
        assert_eq!(next.grid().count().fish, 1);
        let (moved_to, cell) = next
            .grid()
            .iter()
            .find(|(_, cell)| !cell.is_empty())
            .unwrap();
        assert_eq!(*cell, Cell::fish(1));
        assert_eq!((moved_to.x - 2).abs() + (moved_to.y - 2).abs(), 1);
    }

    #[test]
    fn test_fish_breeds_when_due() {
        let mut old = Grid::new(4, 4);
        let origin = Position::new(0, 0);
        old.set(origin, Cell::fish(RULES.fish_breed - 1));

        let mut next = Generation::new(4, 4);
        let outcome = RULES.advance_fish(&old, origin, &mut next, &mut rng());

        assert!(outcome.bred);
        assert_eq!(*next.grid().get(origin), Cell::fish(0));
        assert_eq!(next.grid().count().fish, 2);
        assert!(next
            .grid()
            .iter()
            .all(|(_, cell)| cell.is_empty() || *cell == Cell::fish(0)));
    }

    #[test]
    fn test_saturated_fish_at_threshold_claims_once() {
        let mut old = Grid::new(3, 3);
        for pos in old.positions().collect::<Vec<_>>() {
            old.set(pos, Cell::fish(0));
        }
        let origin = Position::new(1, 1);
        old.set(origin, Cell::fish(RULES.fish_breed - 1));

        let mut next = Generation::new(3, 3);
        let outcome = RULES.advance_fish(&old, origin, &mut next, &mut rng());

        assert!(!outcome.bred);
        assert_eq!(*next.grid().get(origin), Cell::fish(0));
        assert_eq!(next.claims().claimed_count(), 1);
    }

    #[test]
    fn test_fish_does_not_enter_claimed_cell() {
        let mut old = Grid::new(1, 3);
        let origin = Position::new(0, 1);
        old.set(origin, Cell::fish(0));

        let mut next = Generation::new(1, 3);
        next.write(Position::new(0, 0), Cell::shark(0, 5));
        next.write(Position::new(0, 2), Cell::empty());

        RULES.advance_fish(&old, origin, &mut next, &mut rng());
        assert_eq!(*next.grid().get(origin), Cell::fish(1));
    }

    #[test]
    fn test_wrong_species_is_ignored() {
        let mut old = Grid::new(3, 3);
        old.set(Position::new(1, 1), Cell::fish(0));
        let mut next = Generation::new(3, 3);

        let outcome = RULES.advance_shark(&old, Position::new(1, 1), &mut next, &mut rng());
        assert_eq!(outcome, EntityOutcome::default());
        assert_eq!(next.claims().claimed_count(), 0);
    }

    #[test]
    fn test_step_outcome_accumulates() {
        let mut total = StepOutcome::default();
        total.record_shark(EntityOutcome {
            ate: true,
            bred: true,
            starved: false,
        });
        total.record_shark(EntityOutcome {
            ate: false,
            bred: false,
            starved: true,
        });
        total.record_fish(EntityOutcome {
            ate: false,
            bred: true,
            starved: false,
        });

        let mut other = StepOutcome::default();
        other.record_shark(EntityOutcome {
            ate: true,
            bred: false,
            starved: false,
        });
        total.merge(other);

        assert_eq!(
            total,
            StepOutcome {
                fish_eaten: 2,
                fish_born: 1,
                sharks_born: 1,
                sharks_starved: 1,
            }
        );
    }
}
