use std::{
    fmt,
    path::{Path, PathBuf},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position ({row}, {column}) is out of bounds for grid size ({rows}, {columns})")]
    OutOfBounds {
        row: isize,
        column: isize,
        rows: usize,
        columns: usize,
    },
}

/// Errors raised while loading a map. All of them are fatal to startup.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Unable to open file at path: {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Line {line} of map file must start with '{expected}', found: {found:?}")]
    MissingHeader {
        line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("Invalid gold requirement: {0:?}")]
    InvalidGoldRequired(String),
    #[error("Map has no rows")]
    Empty,
    #[error("Map is not rectangular: row {row} has {found} columns, expected {expected}")]
    NotRectangular {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unexpected character in map: {character:?} at ({row}, {column})")]
    UnexpectedCharacter {
        character: char,
        row: usize,
        column: usize,
    },
    #[error("Invalid map: insufficient gold on the map to meet the win requirement ({available} < {required})")]
    InsufficientGold { required: u32, available: usize },
    #[error("Invalid map: not enough space tiles (found {found}, need at least 2)")]
    NotEnoughSpace { found: usize },
    #[error("Invalid map: no exit tile found")]
    NoExit,
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order and is
/// addressed by [`Position`]. Positions with a negative component, or beyond
/// the last row/column, are simply out of bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    columns: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid from cells already laid out in row-major order.
    ///
    /// Returns `None` if `cells.len()` is not `rows * columns`.
    pub fn from_cells(rows: usize, columns: usize, cells: Vec<T>) -> Option<Self> {
        (rows.checked_mul(columns)? == cells.len()).then_some(Grid {
            rows,
            columns,
            cells,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Converts a position to a flat vector index.
    ///
    /// Returns `None` if the position is out of bounds.
    #[inline]
    pub fn index_of(&self, position: Position) -> Option<usize> {
        let row = usize::try_from(position.row).ok()?;
        let column = usize::try_from(position.column).ok()?;
        (row < self.rows && column < self.columns).then(|| row * self.columns + column)
    }

    /// Converts a flat vector index back to a position.
    #[inline]
    pub fn position_of(&self, index: usize) -> Option<Position> {
        (index < self.cells.len()).then(|| {
            Position::new(
                (index / self.columns) as isize,
                (index % self.columns) as isize,
            )
        })
    }

    /// Checks if the given position is within the grid boundaries.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        self.index_of(position).is_some()
    }

    pub fn get(&self, position: Position) -> Option<&T> {
        self.index_of(position).map(|index| &self.cells[index])
    }

    /// Sets the value of the cell at the given position.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self.index_of(position).ok_or(GridError::OutOfBounds {
            row: position.row,
            column: position.column,
            rows: self.rows,
            columns: self.columns,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell, row-major.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let columns = self.columns;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position::new((index / columns) as isize, (index % columns) as isize),
                cell,
            )
        })
    }

    /// Returns the cells of one row, or `None` past the last row.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        (row < self.rows).then(|| &self.cells[row * self.columns..(row + 1) * self.columns])
    }
}

/// Terrain classification of a cell, plus the two live-entity markers.
///
/// `Player` and `Bot` never appear in a map file; they only show up in
/// perception windows and rendered boards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    Exit,
    Gold,
    #[default]
    Space,
    Wall,
    Player,
    Bot,
}

impl Tile {
    pub const ALL: [Tile; 6] = [
        Tile::Exit,
        Tile::Gold,
        Tile::Space,
        Tile::Wall,
        Tile::Player,
        Tile::Bot,
    ];

    pub const fn symbol(self) -> char {
        match self {
            Tile::Exit => 'E',
            Tile::Gold => 'G',
            Tile::Space => '.',
            Tile::Wall => '#',
            Tile::Player => 'P',
            Tile::Bot => 'B',
        }
    }

    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'E' => Some(Tile::Exit),
            'G' => Some(Tile::Gold),
            '.' => Some(Tile::Space),
            '#' => Some(Tile::Wall),
            'P' => Some(Tile::Player),
            'B' => Some(Tile::Bot),
            _ => None,
        }
    }

    /// True for the tiles that mark a live entity rather than terrain.
    pub const fn is_marker(self) -> bool {
        matches!(self, Tile::Player | Tile::Bot)
    }

    /// True for the terrain an entity may step onto.
    pub const fn is_walkable(self) -> bool {
        matches!(self, Tile::Space | Tile::Exit | Tile::Gold)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The authoritative game board: a rectangular tile grid, its display name
/// and the gold needed to win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMap {
    name: String,
    gold_required: u32,
    tiles: Grid<Tile>,
}

impl GridMap {
    /// Reads and validates a map file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::parse(&contents)?;
        tracing::info!(
            "Loaded map {:?} ({}x{}) from {}",
            map.name,
            map.rows(),
            map.columns(),
            path.display()
        );
        Ok(map)
    }

    /// Parses a map from its textual form:
    ///
    /// ```text
    /// name <display name>
    /// win <gold required>
    /// <row 0>
    /// ...
    /// ```
    pub fn parse(contents: &str) -> Result<Self, MapError> {
        let mut lines = contents.lines();

        let name = header_value(lines.next(), 1, "name")?.to_string();
        let win = header_value(lines.next(), 2, "win")?;
        let gold_required = win
            .trim()
            .parse::<u32>()
            .map_err(|_| MapError::InvalidGoldRequired(win.to_string()))?;

        let mut rows: Vec<&str> = lines.collect();
        while rows.last().is_some_and(|line| line.is_empty()) {
            rows.pop();
        }
        let Some(first) = rows.first() else {
            return Err(MapError::Empty);
        };
        let columns = first.chars().count();

        let mut cells = Vec::with_capacity(rows.len() * columns);
        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != columns {
                return Err(MapError::NotRectangular {
                    row,
                    expected: columns,
                    found,
                });
            }
            for (column, character) in line.chars().enumerate() {
                // Markers are reserved for live entities.
                match Tile::from_symbol(character) {
                    Some(tile) if !tile.is_marker() => cells.push(tile),
                    _ => {
                        return Err(MapError::UnexpectedCharacter {
                            character,
                            row,
                            column,
                        });
                    }
                }
            }
        }

        let tiles = Grid::from_cells(rows.len(), columns, cells).ok_or(MapError::Empty)?;
        let map = GridMap {
            name,
            gold_required,
            tiles,
        };
        map.validate()?;
        Ok(map)
    }

    fn validate(&self) -> Result<(), MapError> {
        let available = self.count(Tile::Gold);
        if available < self.gold_required as usize {
            return Err(MapError::InsufficientGold {
                required: self.gold_required,
                available,
            });
        }
        let spaces = self.count(Tile::Space);
        if spaces < 2 {
            return Err(MapError::NotEnoughSpace { found: spaces });
        }
        if self.count(Tile::Exit) < 1 {
            return Err(MapError::NoExit);
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gold_required(&self) -> u32 {
        self.gold_required
    }

    pub fn rows(&self) -> usize {
        self.tiles.rows()
    }

    pub fn columns(&self) -> usize {
        self.tiles.columns()
    }

    pub fn tiles(&self) -> &Grid<Tile> {
        &self.tiles
    }

    /// Tile at `position`, or `None` when the position is off the map.
    pub fn tile_at(&self, position: Position) -> Option<Tile> {
        self.tiles.get(position).copied()
    }

    pub fn set_tile(&mut self, position: Position, tile: Tile) -> Result<(), GridError> {
        self.tiles.set(position, tile)
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }

    /// Samples cells uniformly until one is SPACE or EXIT and differs from
    /// `exclude`.
    ///
    /// Never returns on a map without such a cell; [`GridMap::parse`]
    /// guarantees at least two SPACE tiles.
    pub fn random_start_position<R: Rng + ?Sized>(
        &self,
        exclude: Option<Position>,
        rng: &mut R,
    ) -> Position {
        loop {
            let candidate = Position::new(
                rng.random_range(0..self.rows()) as isize,
                rng.random_range(0..self.columns()) as isize,
            );
            if exclude == Some(candidate) {
                continue;
            }
            if matches!(self.tile_at(candidate), Some(Tile::Space | Tile::Exit)) {
                return candidate;
            }
        }
    }

    /// Renders the whole board with its header. Each overlay replaces the
    /// tile at its position; earlier overlays win when they coincide.
    pub fn render(&self, overlays: &[(Position, Tile)]) -> String {
        let mut out = format!("name {}\nwin {}\n", self.name, self.gold_required);
        for (position, tile) in self.tiles.enumerate() {
            let shown = overlays
                .iter()
                .find(|(at, _)| *at == position)
                .map_or(*tile, |(_, marker)| *marker);
            out.push(shown.symbol());
            if position.column as usize + 1 == self.columns() {
                out.push('\n');
            }
        }
        out
    }
}

fn header_value<'a>(
    line: Option<&'a str>,
    line_number: usize,
    expected: &'static str,
) -> Result<&'a str, MapError> {
    let line = line.unwrap_or_default();
    line.strip_prefix(expected)
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .ok_or_else(|| MapError::MissingHeader {
            line: line_number,
            expected,
            found: line.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    const SMALL: &str = "name Small\nwin 1\n#####\n#.G.#\n#..E#\n#####\n";

    #[test]
    fn parses_header_and_rows() {
        let map = GridMap::parse(SMALL).unwrap();
        assert_eq!(map.name(), "Small");
        assert_eq!(map.gold_required(), 1);
        assert_eq!((map.rows(), map.columns()), (4, 5));
        assert_eq!(map.tile_at(Position::new(1, 2)), Some(Tile::Gold));
        assert_eq!(map.tile_at(Position::new(2, 3)), Some(Tile::Exit));
        assert_eq!(map.tile_at(Position::new(0, 0)), Some(Tile::Wall));
    }

    #[test]
    fn out_of_bounds_is_none() {
        let map = GridMap::parse(SMALL).unwrap();
        assert_eq!(map.tile_at(Position::new(-1, 0)), None);
        assert_eq!(map.tile_at(Position::new(0, -1)), None);
        assert_eq!(map.tile_at(Position::new(4, 0)), None);
        assert_eq!(map.tile_at(Position::new(0, 5)), None);
    }

    #[test]
    fn accepts_crlf_and_trailing_blank_lines() {
        let map = GridMap::parse("name Small\r\nwin 0\r\n...\r\n.E.\r\n\r\n").unwrap();
        assert_eq!((map.rows(), map.columns()), (2, 3));
    }

    #[test]
    fn rejects_missing_name_header() {
        let err = GridMap::parse("title Small\nwin 1\n..E\n").unwrap_err();
        assert!(matches!(
            err,
            MapError::MissingHeader {
                expected: "name",
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_win_value() {
        let err = GridMap::parse("name x\nwin lots\n..E\n").unwrap_err();
        assert!(matches!(err, MapError::InvalidGoldRequired(_)));
        let err = GridMap::parse("name x\nwin -1\n..E\n").unwrap_err();
        assert!(matches!(err, MapError::InvalidGoldRequired(_)));
    }

    #[test]
    fn rejects_non_rectangular_grid() {
        let err = GridMap::parse("name x\nwin 0\n...\n..\nE..\n").unwrap_err();
        assert!(matches!(
            err,
            MapError::NotRectangular {
                row: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn rejects_entity_markers_and_unknown_characters() {
        for bad in ['P', 'B', 'x', ' '] {
            let text = format!("name x\nwin 0\n..E\n.{bad}.\n");
            let err = GridMap::parse(&text).unwrap_err();
            assert!(
                matches!(err, MapError::UnexpectedCharacter { character, row: 1, column: 1 } if character == bad),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn validates_content_counts() {
        assert!(matches!(
            GridMap::parse("name x\nwin 2\n..G\nE..\n").unwrap_err(),
            MapError::InsufficientGold {
                required: 2,
                available: 1
            }
        ));
        assert!(matches!(
            GridMap::parse("name x\nwin 0\n#.E\n###\n").unwrap_err(),
            MapError::NotEnoughSpace { found: 1 }
        ));
        assert!(matches!(
            GridMap::parse("name x\nwin 0\n...\n###\n").unwrap_err(),
            MapError::NoExit
        ));
        assert!(matches!(
            GridMap::parse("name x\nwin 0\n").unwrap_err(),
            MapError::Empty
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = GridMap::load("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, MapError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, SMALL.as_bytes()).unwrap();
        let map = GridMap::load(file.path()).unwrap();
        assert_eq!(map.name(), "Small");
    }

    #[test]
    fn set_tile_rejects_out_of_bounds() {
        let mut map = GridMap::parse(SMALL).unwrap();
        map.set_tile(Position::new(1, 2), Tile::Space).unwrap();
        assert_eq!(map.tile_at(Position::new(1, 2)), Some(Tile::Space));
        assert!(map.set_tile(Position::new(9, 9), Tile::Space).is_err());
    }

    #[test]
    fn random_start_lands_on_space_or_exit_and_avoids_exclusion() {
        let map = GridMap::parse(SMALL).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let excluded = Position::new(1, 1);
        for _ in 0..200 {
            let start = map.random_start_position(Some(excluded), &mut rng);
            assert_ne!(start, excluded);
            assert!(matches!(
                map.tile_at(start),
                Some(Tile::Space | Tile::Exit)
            ));
        }
    }

    #[test]
    fn render_overlays_entities() {
        let map = GridMap::parse(SMALL).unwrap();
        let rendered = map.render(&[
            (Position::new(1, 1), Tile::Player),
            (Position::new(2, 2), Tile::Bot),
        ]);
        assert_eq!(rendered, "name Small\nwin 1\n#####\n#PG.#\n#.BE#\n#####\n");
    }

    #[test]
    fn tile_table_is_unique() {
        use std::collections::HashSet;

        let symbols: HashSet<char> = Tile::ALL.iter().map(|t| t.symbol()).collect();
        assert_eq!(symbols.len(), Tile::ALL.len());
        for tile in Tile::ALL {
            assert_eq!(Tile::from_symbol(tile.symbol()), Some(tile));
        }
    }
}
