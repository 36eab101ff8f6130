//! 2D toroidal grid, claim mask and neighbor selection.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use wator_core::{Cell, Direction, Position, Species, WorldConfig};

/// A 2D toroidal grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        let size = width.max(0) as usize * height.max(0) as usize;
        Self {
            width,
            height,
            cells: vec![Cell::empty(); size],
        }
    }

    /// Create a grid from world configuration.
    ///
    /// Fish and sharks land on distinct random cells with a breed timer drawn
    /// from `[0, threshold)`; sharks start fully fed. The caller is expected
    /// to have validated `config`.
    pub fn from_config<R: Rng + ?Sized>(config: &WorldConfig, rng: &mut R) -> Self {
        let mut grid = Self::new(config.width, config.height);

        let mut indices: Vec<usize> = (0..grid.cells.len()).collect();
        let placed = config.num_fish.saturating_add(config.num_sharks).min(indices.len());
        let (chosen, _) = indices.partial_shuffle(rng, placed);

        for (n, &index) in chosen.iter().enumerate() {
            grid.cells[index] = if n < config.num_fish {
                Cell::fish(rng.gen_range(0..config.fish_breed))
            } else {
                Cell::shark(rng.gen_range(0..config.shark_breed), config.shark_starve)
            };
        }

        grid
    }

    /// Get cell at position (with toroidal wrapping)
    pub fn get(&self, pos: Position) -> &Cell {
        let wrapped = pos.wrap(self.width, self.height);
        let index = self.pos_to_index(wrapped);
        &self.cells[index]
    }

    /// Set cell at position
    pub fn set(&mut self, pos: Position, cell: Cell) {
        let wrapped = pos.wrap(self.width, self.height);
        let index = self.pos_to_index(wrapped);
        self.cells[index] = cell;
    }

    /// Unclaimed orthogonal neighbors of `pos` holding `want`.
    ///
    /// Reads only this grid and `claims`, never the grid being built.
    pub fn neighbors(&self, pos: Position, want: Species, claims: &ClaimMask) -> Neighbors {
        let mut found = Neighbors::default();

        for direction in Direction::all() {
            let neighbor = pos.step(direction, self.width, self.height);
            if !claims.is_claimed(neighbor) && self.get(neighbor).species() == want {
                found.push(neighbor);
            }
        }

        found
    }

    /// Count fish and sharks
    pub fn count(&self) -> Population {
        self.cells
            .iter()
            .fold(Population::default(), |mut population, cell| {
                match cell.species() {
                    Species::Fish => population.fish += 1,
                    Species::Shark => population.sharks += 1,
                    Species::Empty => {}
                }
                population
            })
    }

    pub(crate) fn pos_to_index(&self, pos: Position) -> usize {
        (pos.y * self.width + pos.x) as usize
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_pos(i))
    }

    /// Positions of one row band `[start_row, end_row)` in row-major order
    pub fn band(&self, start_row: i32, end_row: i32) -> impl Iterator<Item = Position> {
        let width = self.width;
        (start_row..end_row).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }

    /// Iterator over all cells with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), cell))
    }
}

/// Fish and shark totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    pub fish: usize,
    pub sharks: usize,
}

impl Population {
    /// The species that has died out, if any (fish are checked first)
    pub fn extinct(&self) -> Option<Species> {
        if self.fish == 0 {
            Some(Species::Fish)
        } else if self.sharks == 0 {
            Some(Species::Shark)
        } else {
            None
        }
    }

    pub fn total(&self) -> usize {
        self.fish + self.sharks
    }
}

/// Per-step record of which cells of the next grid have been written
#[derive(Debug, Clone)]
pub struct ClaimMask {
    width: i32,
    height: i32,
    claimed: Vec<bool>,
}

impl ClaimMask {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            claimed: vec![false; width.max(0) as usize * height.max(0) as usize],
        }
    }

    pub fn is_claimed(&self, pos: Position) -> bool {
        self.claimed[self.index(pos)]
    }

    /// Mark `pos` claimed. Returns false if it already was.
    pub fn claim(&mut self, pos: Position) -> bool {
        let index = self.index(pos);
        !std::mem::replace(&mut self.claimed[index], true)
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.iter().filter(|&&c| c).count()
    }

    fn index(&self, pos: Position) -> usize {
        let wrapped = pos.wrap(self.width, self.height);
        (wrapped.y * self.width + wrapped.x) as usize
    }
}

/// Up to four candidate neighbor cells
#[derive(Debug, Clone, Copy)]
pub struct Neighbors {
    cells: [Position; 4],
    len: usize,
}

impl Default for Neighbors {
    fn default() -> Self {
        Self {
            cells: [Position::new(0, 0); 4],
            len: 0,
        }
    }
}

impl Neighbors {
    fn push(&mut self, pos: Position) {
        self.cells[self.len] = pos;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.cells[..self.len]
    }

    /// Pick one candidate uniformly at random. Draws nothing when empty.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        self.as_slice().choose(rng).copied()
    }
}
