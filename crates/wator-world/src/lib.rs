//! Wa-Tor step-advance engine.
//!
//! Fish and sharks live on a toroidal grid and advance together one chronon
//! per step: sharks move, feed, breed and starve first, then fish move and
//! breed. Steps run sequentially or split across worker threads.

pub mod grid;
pub mod rules;
pub mod scheduler;
pub mod world;

pub use grid::{ClaimMask, Grid, Neighbors, Population};
pub use rules::{EntityOutcome, Generation, Rules, StepOutcome};
pub use scheduler::Strategy;
pub use world::World;
