//! The bounded, entity-centred view of the board returned by `LOOK`.
//!
//! A [`LocalView`] is everything the bot is allowed to know about the map.
//! Coordinates inside a view are local: `(0, 0)` is the top-left cell and
//! [`LocalView::CENTER`] is the observer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Direction, Position, map::GridMap, map::Tile};

/// Side length of the window.
pub const VIEW_SIZE: usize = 5;

const RADIUS: isize = (VIEW_SIZE / 2) as isize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalView {
    cells: [[Tile; VIEW_SIZE]; VIEW_SIZE],
}

impl LocalView {
    pub const CENTER: Position = Position::new(RADIUS, RADIUS);

    /// Captures the window around `center`.
    ///
    /// Off-map cells read as [`Tile::Wall`], the opponent's marker replaces
    /// whatever it stands on, and the centre always shows `own_symbol`.
    pub fn capture(
        map: &GridMap,
        center: Position,
        own_symbol: Tile,
        opponent: Option<(Position, Tile)>,
    ) -> Self {
        let mut cells = [[Tile::Wall; VIEW_SIZE]; VIEW_SIZE];
        for (row, line) in cells.iter_mut().enumerate() {
            for (column, cell) in line.iter_mut().enumerate() {
                let on_map = Position::new(
                    center.row - RADIUS + row as isize,
                    center.column - RADIUS + column as isize,
                );
                *cell = match (map.tile_at(on_map), opponent) {
                    (None, _) => Tile::Wall,
                    (Some(_), Some((at, marker))) if at == on_map => marker,
                    (Some(tile), _) => tile,
                };
            }
        }
        cells[RADIUS as usize][RADIUS as usize] = own_symbol;
        LocalView { cells }
    }

    /// Builds a view from explicit cells.
    pub const fn from_cells(cells: [[Tile; VIEW_SIZE]; VIEW_SIZE]) -> Self {
        LocalView { cells }
    }

    /// Tile at a local position, or `None` outside the window.
    pub fn get(&self, position: Position) -> Option<Tile> {
        let row = usize::try_from(position.row).ok()?;
        let column = usize::try_from(position.column).ok()?;
        self.cells.get(row)?.get(column).copied()
    }

    /// A step is legal when it stays inside the window and does not hit a wall.
    pub fn is_move_valid(&self, from: Position, direction: Direction) -> bool {
        self.get(from.step(direction))
            .is_some_and(|tile| tile != Tile::Wall)
    }

    /// Cells in scan order (row-major) with their local positions.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, line)| {
            line.iter()
                .enumerate()
                .map(move |(column, tile)| (Position::new(row as isize, column as isize), *tile))
        })
    }

    pub fn rows(&self) -> &[[Tile; VIEW_SIZE]; VIEW_SIZE] {
        &self.cells
    }
}

impl fmt::Display for LocalView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.cells.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            for tile in line {
                write!(f, "{tile}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> GridMap {
        GridMap::parse("name t\nwin 0\n.....\n.G...\n..E..\n.....\n.....\n").unwrap()
    }

    #[test]
    fn corner_view_pads_with_walls() {
        let map = board();
        let view = LocalView::capture(&map, Position::new(0, 0), Tile::Bot, None);
        assert_eq!(view.to_string(), "#####\n#####\n##B..\n##.G.\n##..E");
    }

    #[test]
    fn opponent_replaces_underlying_tile() {
        let map = board();
        let view = LocalView::capture(
            &map,
            Position::new(2, 2),
            Tile::Bot,
            Some((Position::new(1, 1), Tile::Player)),
        );
        assert_eq!(view.get(Position::new(1, 1)), Some(Tile::Player));
        // the bot stands on the exit, but sees only itself there
        assert_eq!(view.get(LocalView::CENTER), Some(Tile::Bot));
    }

    #[test]
    fn opponent_outside_window_is_invisible() {
        let map = GridMap::parse("name t\nwin 0\n.......\n......E\n").unwrap();
        let view = LocalView::capture(
            &map,
            Position::new(0, 0),
            Tile::Bot,
            Some((Position::new(0, 6), Tile::Player)),
        );
        assert!(view.enumerate().all(|(_, tile)| tile != Tile::Player));
    }

    #[test]
    fn moves_off_window_edge_are_invalid() {
        let view = LocalView::from_cells([[Tile::Space; VIEW_SIZE]; VIEW_SIZE]);
        assert!(view.is_move_valid(Position::new(0, 0), Direction::South));
        assert!(!view.is_move_valid(Position::new(0, 0), Direction::North));
        assert!(!view.is_move_valid(Position::new(4, 4), Direction::East));
    }
}
