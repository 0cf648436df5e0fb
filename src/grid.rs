//! Grid world representation and basic spatial operations

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A cell on the grid, addressed by (row, col)
///
/// This type implements `Copy` since it is only two machine words and is
/// passed around constantly in the simulation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another cell
    pub fn manhattan_distance(self, other: Cell) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// True if the other cell is exactly one orthogonal step away
    pub fn is_adjacent(self, other: Cell) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the four unit-step movement directions
///
/// There is deliberately no "stay" action: every unfinished agent must move
/// each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    North,
    South,
    West,
    East,
}

impl Action {
    /// All actions in canonical index order
    pub const ALL: [Action; 4] = [Action::North, Action::South, Action::West, Action::East];

    /// Number of distinct actions
    pub const COUNT: usize = 4;

    /// Canonical index of this action
    pub fn index(self) -> usize {
        match self {
            Action::North => 0,
            Action::South => 1,
            Action::West => 2,
            Action::East => 3,
        }
    }

    /// Action for a canonical index, if in range
    pub fn from_index(index: usize) -> Option<Action> {
        Action::ALL.get(index).copied()
    }

    /// (row, col) displacement of this action
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::North => (-1, 0),
            Action::South => (1, 0),
            Action::West => (0, -1),
            Action::East => (0, 1),
        }
    }
}

/// The two waypoint locations an episode shuttles agents between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoints {
    pub a: Cell,
    pub b: Cell,
}

impl Waypoints {
    /// Create a waypoint pair
    ///
    /// # Errors
    ///
    /// Returns an error if both waypoints are the same cell.
    pub fn new(a: Cell, b: Cell) -> Result<Self> {
        if a == b {
            return Err(Error::InvalidConfiguration {
                message: format!("waypoints must be distinct, both are {a}"),
            });
        }
        Ok(Self { a, b })
    }

    /// The waypoint opposite to `cell` (which must be one of the two)
    pub fn opposite(&self, cell: Cell) -> Cell {
        if cell == self.a { self.b } else { self.a }
    }
}

/// The shared N×N lattice all agents move on
///
/// Pure spatial data: bounds checking, stepping, and waypoint sampling.
/// It holds no agent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWorld {
    size: usize,
}

impl GridWorld {
    /// Create a grid of the given side length
    ///
    /// # Errors
    ///
    /// Returns an error for sizes below 2, where distinct waypoints cannot
    /// be sampled.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 {
            return Err(Error::InvalidConfiguration {
                message: format!("grid size must be at least 2, got {size}"),
            });
        }
        Ok(Self { size })
    }

    /// Side length of the grid
    pub fn size(&self) -> usize {
        self.size
    }

    /// True if the cell lies within grid bounds
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.size && cell.col < self.size
    }

    /// Apply an action to a cell, returning the resulting cell or `None`
    /// if the move would leave the grid
    pub fn step(&self, cell: Cell, action: Action) -> Option<Cell> {
        let (dr, dc) = action.delta();
        let row = cell.row.checked_add_signed(dr)?;
        let col = cell.col.checked_add_signed(dc)?;
        let next = Cell::new(row, col);
        self.contains(next).then_some(next)
    }

    /// Sample a cell uniformly at random
    pub fn sample_cell<R: Rng>(&self, rng: &mut R) -> Cell {
        Cell::new(rng.random_range(0..self.size), rng.random_range(0..self.size))
    }

    /// Sample a distinct waypoint pair, resampling until A != B
    pub fn sample_waypoints<R: Rng>(&self, rng: &mut R) -> Waypoints {
        let a = self.sample_cell(rng);
        let mut b = self.sample_cell(rng);
        while b == a {
            b = self.sample_cell(rng);
        }
        Waypoints { a, b }
    }
}
