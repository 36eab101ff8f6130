//! Step scheduler: one full chronon, sharks first, then fish.
//!
//! Both strategies sweep the old grid in row-major order and skip any source
//! cell already claimed in the next generation (a fish that was eaten). The
//! parallel strategy splits the rows into contiguous bands, one worker per
//! band, and serializes each candidate cell's processing on a single lock
//! around the next generation. The old grid is shared read-only.

use crate::grid::Grid;
use crate::rules::{EntityOutcome, Generation, Rules, StepOutcome};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::thread;
use tracing::{debug, trace};
use wator_core::{Position, Species};

/// How a step is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sequential,
    Parallel { workers: usize },
}

impl Strategy {
    /// One thread (or zero) runs sequentially, more run in parallel bands
    pub fn from_threads(threads: usize) -> Self {
        if threads <= 1 {
            Strategy::Sequential
        } else {
            Strategy::Parallel { workers: threads }
        }
    }
}

/// The two phases of a step, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Sharks,
    Fish,
}

impl Phase {
    const ORDER: [Phase; 2] = [Phase::Sharks, Phase::Fish];

    fn species(self) -> Species {
        match self {
            Phase::Sharks => Species::Shark,
            Phase::Fish => Species::Fish,
        }
    }

    /// Advance the entity at `pos` if it still belongs to this phase
    fn visit<R: Rng + ?Sized>(
        self,
        rules: &Rules,
        old: &Grid,
        pos: Position,
        next: &mut Generation,
        rng: &mut R,
        outcome: &mut StepOutcome,
    ) {
        if next.claims().is_claimed(pos) {
            return;
        }

        let result: EntityOutcome = match self {
            Phase::Sharks => rules.advance_shark(old, pos, next, rng),
            Phase::Fish => rules.advance_fish(old, pos, next, rng),
        };

        match self {
            Phase::Sharks => outcome.record_shark(result),
            Phase::Fish => outcome.record_fish(result),
        }
    }
}

/// Compute the next generation of `old`
pub fn run_step<R: Rng + ?Sized>(
    old: &Grid,
    rules: &Rules,
    strategy: Strategy,
    rng: &mut R,
) -> (Grid, StepOutcome) {
    let (next, outcome) = match strategy {
        Strategy::Sequential => sequential(old, rules, rng),
        Strategy::Parallel { workers } => parallel(old, rules, workers, rng),
    };
    (next.into_grid(), outcome)
}

fn sequential<R: Rng + ?Sized>(
    old: &Grid,
    rules: &Rules,
    rng: &mut R,
) -> (Generation, StepOutcome) {
    let mut next = Generation::new(old.width, old.height);
    let mut outcome = StepOutcome::default();

    for phase in Phase::ORDER {
        let want = phase.species();
        for pos in old.positions() {
            if old.get(pos).species() == want {
                phase.visit(rules, old, pos, &mut next, rng, &mut outcome);
            }
        }
        trace!(?phase, claimed = next.claims().claimed_count(), "Phase complete");
    }

    (next, outcome)
}

fn parallel<R: Rng + ?Sized>(
    old: &Grid,
    rules: &Rules,
    workers: usize,
    rng: &mut R,
) -> (Generation, StepOutcome) {
    let next = Mutex::new(Generation::new(old.width, old.height));
    let bands = bands(old.height, workers);

    // Each worker draws from its own stream, seeded once per step
    let mut worker_rngs: Vec<ChaCha8Rng> = bands
        .iter()
        .map(|_| ChaCha8Rng::seed_from_u64(rng.gen()))
        .collect();

    debug!(workers = bands.len(), "Running parallel step");

    let mut outcome = StepOutcome::default();
    for phase in Phase::ORDER {
        let want = phase.species();

        // Scope exit joins every worker: no fish moves before all sharks are done
        let partials: Vec<StepOutcome> = thread::scope(|scope| {
            let handles: Vec<_> = bands
                .iter()
                .zip(worker_rngs.iter_mut())
                .map(|(&(start_row, end_row), worker_rng)| {
                    let next = &next;
                    scope.spawn(move || {
                        let mut local = StepOutcome::default();
                        for pos in old.band(start_row, end_row) {
                            if old.get(pos).species() != want {
                                continue;
                            }
                            let mut guard = next.lock();
                            phase.visit(rules, old, pos, &mut guard, &mut *worker_rng, &mut local);
                        }
                        local
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        for partial in partials {
            outcome.merge(partial);
        }
        trace!(?phase, "Phase complete");
    }

    (next.into_inner(), outcome)
}

/// Split `height` rows into contiguous `[start, end)` bands, one per worker.
///
/// Every band gets `height / workers` rows (at least one) and the last band
/// absorbs the remainder. Bands that would start past the last row are
/// dropped.
pub fn bands(height: i32, workers: usize) -> Vec<(i32, i32)> {
    let workers = i32::try_from(workers.max(1)).unwrap_or(i32::MAX);
    let rows_per = (height / workers).max(1);

    (0..workers)
        .map(|t| {
            let start = t.saturating_mul(rows_per).min(height);
            let end = if t == workers - 1 {
                height
            } else {
                (start + rows_per).min(height)
            };
            (start, end)
        })
        .filter(|(start, end)| start < end)
        .collect()
}
