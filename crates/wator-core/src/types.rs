//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 2D position in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Apply toroidal wrapping for given world dimensions
    pub fn wrap(&self, width: i32, height: i32) -> Self {
        Self {
            x: ((self.x % width) + width) % width,
            y: ((self.y % height) + height) % height,
        }
    }

    /// Orthogonal neighbor in `direction`, wrapped onto a `width` x `height` torus
    pub fn step(&self, direction: Direction, width: i32, height: i32) -> Self {
        let (dx, dy) = direction.to_delta();
        self.add(dx, dy).wrap(width, height)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orthogonal movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::South,
            Direction::West,
            Direction::East,
        ]
    }
}

/// What occupies a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Empty,
    Fish,
    Shark,
}

/// Cell state.
///
/// Only occupied cells carry a breed timer, and only sharks carry energy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Fish {
        breed_timer: i32,
    },
    Shark {
        breed_timer: i32,
        energy: i32,
    },
}

impl Cell {
    pub fn empty() -> Self {
        Cell::Empty
    }

    pub fn fish(breed_timer: i32) -> Self {
        Cell::Fish { breed_timer }
    }

    pub fn shark(breed_timer: i32, energy: i32) -> Self {
        Cell::Shark {
            breed_timer,
            energy,
        }
    }

    pub fn species(&self) -> Species {
        match self {
            Cell::Empty => Species::Empty,
            Cell::Fish { .. } => Species::Fish,
            Cell::Shark { .. } => Species::Shark,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}
