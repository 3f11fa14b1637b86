//! Tile grid parsed from level text and the stage addressing built on top of it.

use glam::Vec2;
use stagewalker_core::{Archetype, StageCoord, StageSize, TileCoord};

/// Errors raised while validating a level grid or addressing its stages.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    /// The level contained no rows.
    #[error("level grid is empty")]
    Empty,
    /// A row length differed from the first row.
    #[error("row {row} has {found} tiles, expected {expected}")]
    Ragged {
        /// Zero-based row index.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// The stage does not fit inside the loaded grid.
    #[error("stage {stage} lies outside the loaded grid")]
    StageOutOfBounds {
        /// Requested stage.
        stage: StageCoord,
    },
    /// The grid does not split into whole viewport-sized stages.
    #[error("a {grid_columns}x{grid_rows} grid does not split into {columns}x{rows} stages")]
    ViewportMismatch {
        /// Tile columns of the grid.
        grid_columns: usize,
        /// Tile rows of the grid.
        grid_rows: usize,
        /// Viewport columns.
        columns: u32,
        /// Viewport rows.
        rows: u32,
    },
    /// A door directive references tiles outside its stage.
    #[error("door in stage {stage} spans tiles outside the stage")]
    DoorOutsideStage {
        /// Stage the door belongs to.
        stage: StageCoord,
    },
}

/// Meaning of a level symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    /// Walkable floor; also used for unrecognized symbols.
    Floor,
    /// Solid wall (`#`).
    Wall,
    /// Floor that path-finders must avoid (`S`).
    SpawnOnly,
    /// Player spawn point (`P`).
    PlayerSpawn,
    /// Enemy spawn point (`F`, `R`, `H`, `M`).
    Enemy(Archetype),
    /// Pushable block (`B`).
    Block,
    /// Spike trap (`^`).
    Spike,
    /// Decoration (`O`).
    Ornament,
}

impl Tile {
    /// Classifies a level symbol.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Self {
        match symbol {
            '#' => Self::Wall,
            'S' => Self::SpawnOnly,
            'P' => Self::PlayerSpawn,
            'F' => Self::Enemy(Archetype::FireMage),
            'R' => Self::Enemy(Archetype::RootMage),
            'H' => Self::Enemy(Archetype::HookMage),
            'M' => Self::Enemy(Archetype::Brute),
            'B' => Self::Block,
            '^' => Self::Spike,
            'O' => Self::Ornament,
            _ => Self::Floor,
        }
    }

    /// Whether the tile blocks path-finding; spawn-only tiles count when `include_spawn` is set.
    #[must_use]
    pub const fn obstructs(self, include_spawn: bool) -> bool {
        match self {
            Self::Wall => true,
            Self::SpawnOnly => include_spawn,
            _ => false,
        }
    }
}

/// Rectangular grid of level symbols partitioned into viewport-sized stages.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelGrid {
    rows: Vec<Vec<char>>,
    columns: usize,
    stage_size: StageSize,
    tile_size: f32,
}

impl LevelGrid {
    /// Builds a grid from rows of symbols.
    pub fn from_rows<I, S>(rows: I, stage_size: StageSize, tile_size: f32) -> Result<Self, LevelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows: Vec<Vec<char>> = rows
            .into_iter()
            .map(|row| row.as_ref().chars().collect())
            .collect();

        let Some(expected) = rows.first().map(Vec::len) else {
            return Err(LevelError::Empty);
        };
        if expected == 0 {
            return Err(LevelError::Empty);
        }

        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, length)| *length != expected)
        {
            return Err(LevelError::Ragged {
                row,
                expected,
                found,
            });
        }

        let whole = |tiles: usize, stage: u32| {
            usize::try_from(stage).is_ok_and(|stage| stage > 0 && tiles % stage == 0)
        };
        if !whole(expected, stage_size.columns()) || !whole(rows.len(), stage_size.rows()) {
            return Err(LevelError::ViewportMismatch {
                grid_columns: expected,
                grid_rows: rows.len(),
                columns: stage_size.columns(),
                rows: stage_size.rows(),
            });
        }

        Ok(Self {
            rows,
            columns: expected,
            stage_size,
            tile_size,
        })
    }

    /// Parses level text with one row per line, ignoring trailing blank lines.
    pub fn parse(text: &str, stage_size: StageSize, tile_size: f32) -> Result<Self, LevelError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            let _ = lines.pop();
        }
        Self::from_rows(lines, stage_size, tile_size)
    }

    /// Stage dimensions in tiles.
    #[must_use]
    pub const fn stage_size(&self) -> StageSize {
        self.stage_size
    }

    /// Side length of a tile in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Viewport extent in world units.
    #[must_use]
    pub fn viewport(&self) -> Vec2 {
        self.stage_size.extent(self.tile_size)
    }

    /// Number of tile columns across the whole grid.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of tile rows across the whole grid.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Tile containing the world position, by integer division with the tile size.
    #[must_use]
    pub fn tile_of(&self, position: Vec2) -> Option<TileCoord> {
        let tile = (position / self.tile_size).floor();
        if tile.x < 0.0 || tile.y < 0.0 || !tile.is_finite() {
            return None;
        }
        Some(TileCoord::new(tile.x as u32, tile.y as u32))
    }

    /// Whether the whole stage lies inside the grid.
    #[must_use]
    pub fn contains_stage(&self, stage: StageCoord) -> bool {
        self.stage_origin(stage).is_some_and(|(column, row)| {
            let columns = usize::try_from(self.stage_size.columns()).unwrap_or(usize::MAX);
            let rows = usize::try_from(self.stage_size.rows()).unwrap_or(usize::MAX);
            column.saturating_add(columns) <= self.columns && row.saturating_add(rows) <= self.rows.len()
        })
    }

    /// Symbol at the stage-relative tile, if it lies inside the grid.
    #[must_use]
    pub fn symbol(&self, stage: StageCoord, tile: TileCoord) -> Option<char> {
        if tile.column() >= self.stage_size.columns() || tile.row() >= self.stage_size.rows() {
            return None;
        }

        let (origin_column, origin_row) = self.stage_origin(stage)?;
        let column = origin_column.checked_add(usize::try_from(tile.column()).ok()?)?;
        let row = origin_row.checked_add(usize::try_from(tile.row()).ok()?)?;
        self.rows.get(row)?.get(column).copied()
    }

    /// Classified tile at the stage-relative coordinate.
    #[must_use]
    pub fn tile(&self, stage: StageCoord, tile: TileCoord) -> Option<Tile> {
        self.symbol(stage, tile).map(Tile::from_symbol)
    }

    /// Whether the stage-relative tile is obstructed.
    ///
    /// Tiles outside the grid are reported as obstructed.
    #[must_use]
    pub fn is_wall(&self, stage: StageCoord, tile: TileCoord, include_spawn: bool) -> bool {
        self.tile(stage, tile)
            .map_or(true, |tile| tile.obstructs(include_spawn))
    }

    /// World-space centre of a stage-relative tile.
    #[must_use]
    pub fn tile_center(&self, tile: TileCoord) -> Vec2 {
        tile.center(self.tile_size)
    }

    fn stage_origin(&self, stage: StageCoord) -> Option<(usize, usize)> {
        let column = usize::try_from(stage.x())
            .ok()?
            .checked_mul(usize::try_from(self.stage_size.columns()).ok()?)?;
        let row = usize::try_from(stage.y())
            .ok()?
            .checked_mul(usize::try_from(self.stage_size.rows()).ok()?)?;
        Some((column, row))
    }
}
