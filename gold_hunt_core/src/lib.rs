use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod engine;
pub mod game;
pub mod map;
pub mod view;

pub use agent::{Agent, BotAgent, Goal, ScriptedAgent};
pub use engine::{Command, CommandError, Entity, MoveError, Response, execute};
pub use game::{
    Actor, Controller, Game, GameConfig, GameError, GameMode, GameOutcome, GameReport, TurnEvent,
    TurnReport,
};
pub use map::{Grid, GridError, GridMap, MapError, Tile};
pub use view::LocalView;

/// Represents a 2D coordinate as (row, column), with row 0 at the top.
///
/// Coordinates are signed so a step off the edge of a grid can be expressed
/// and then rejected by a bounds check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: isize,
    pub column: isize,
}

impl Position {
    pub const fn new(row: isize, column: isize) -> Self {
        Position { row, column }
    }

    /// Returns the position one unit away in `direction`.
    pub const fn step(self, direction: Direction) -> Self {
        let (d_row, d_column) = direction.delta();
        Position {
            row: self.row + d_row,
            column: self.column + d_column,
        }
    }

    /// Returns manhattan distance between two positions
    pub const fn manhattan_distance(self, other: Position) -> usize {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row={} column={}", self.row, self.column)
    }
}

/// The four compass directions an entity may move in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// (row, column) offset of a single step.
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    /// Protocol character for this direction, as used in `MOVE <dir>`.
    pub const fn symbol(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::East => 'E',
            Direction::South => 'S',
            Direction::West => 'W',
        }
    }

    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'N' => Some(Direction::North),
            'E' => Some(Direction::East),
            'S' => Some(Direction::South),
            'W' => Some(Direction::West),
            _ => None,
        }
    }
}
