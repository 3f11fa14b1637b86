#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first pathfinding over the tiles of the active stage.
//!
//! The pathfinder floods a distance field outward from the seeker's tile and
//! then walks backward from the target tile, always stepping onto a neighbour
//! whose distance is exactly one less. Neighbours are visited in the fixed
//! order `-x, -y, +x, +y`, which also decides ties during reconstruction.
//! Nothing is cached between invocations; callers rebuild every frame.

use std::collections::VecDeque;

use stagewalker_core::{Direction, TileCoord};

const UNREACHED: u32 = u32::MAX;

/// Dense step-count grid produced by a breadth-first search from a single source.
#[derive(Clone, Debug, Default)]
pub struct DistanceField {
    width: u32,
    height: u32,
    distances: Vec<u32>,
}

impl DistanceField {
    /// Rebuilds the distances outward from `source`.
    ///
    /// A tile is expanded only when it lies inside `width` × `height` and the
    /// `is_blocked` predicate rejects it. The source tile is always seeded with
    /// distance zero; a source outside the field leaves every tile unreached.
    pub fn rebuild_with<F>(&mut self, width: u32, height: u32, source: TileCoord, mut is_blocked: F)
    where
        F: FnMut(TileCoord) -> bool,
    {
        let width_usize = usize::try_from(width).unwrap_or(0);
        let height_usize = usize::try_from(height).unwrap_or(0);
        let cell_count = width_usize.checked_mul(height_usize).unwrap_or(0);

        self.width = width;
        self.height = height;

        if self.distances.len() != cell_count {
            self.distances = vec![UNREACHED; cell_count];
        } else {
            self.distances.fill(UNREACHED);
        }

        if cell_count == 0 || source.column() >= width || source.row() >= height {
            return;
        }

        let Some(source_index) = index(width_usize, source) else {
            return;
        };
        self.distances[source_index] = 0;

        let mut queue = VecDeque::with_capacity(cell_count);
        queue.push_back(source);

        while let Some(tile) = queue.pop_front() {
            let Some(current_index) = index(width_usize, tile) else {
                continue;
            };
            let next_distance = self.distances[current_index].saturating_add(1);

            for direction in Direction::ALL {
                let Some(neighbor) = tile.step(direction, width, height) else {
                    continue;
                };
                let Some(neighbor_index) = index(width_usize, neighbor) else {
                    continue;
                };

                if self.distances[neighbor_index] != UNREACHED || is_blocked(neighbor) {
                    continue;
                }

                self.distances[neighbor_index] = next_distance;
                queue.push_back(neighbor);
            }
        }
    }

    /// Width of the field in tiles.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the field in tiles.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Step count from the source to the tile, or `None` when it was never reached.
    #[must_use]
    pub fn distance(&self, tile: TileCoord) -> Option<u32> {
        if tile.column() >= self.width || tile.row() >= self.height {
            return None;
        }

        let width = usize::try_from(self.width).ok()?;
        index(width, tile)
            .and_then(|offset| self.distances.get(offset).copied())
            .filter(|distance| *distance != UNREACHED)
    }
}

/// Per-seeker path state recomputed on every update.
#[derive(Clone, Debug, Default)]
pub struct Pathfinder {
    field: DistanceField,
    nodes: Vec<TileCoord>,
}

impl Pathfinder {
    /// Creates a pathfinder with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the tile sequence leading from `source` to `target`.
    ///
    /// The returned slice starts at the first step away from `source` and ends
    /// on `target`. It is empty when both tiles coincide or when `target` was
    /// never reached by the search.
    pub fn find_path<F>(
        &mut self,
        width: u32,
        height: u32,
        source: TileCoord,
        target: TileCoord,
        is_blocked: F,
    ) -> &[TileCoord]
    where
        F: FnMut(TileCoord) -> bool,
    {
        self.field.rebuild_with(width, height, source, is_blocked);
        self.nodes.clear();

        let Some(mut remaining) = self.field.distance(target) else {
            return &self.nodes;
        };
        if remaining == 0 {
            return &self.nodes;
        }

        let mut current = target;
        self.nodes.push(current);

        while remaining > 1 {
            let wanted = remaining - 1;
            let Some(previous) = Direction::ALL
                .into_iter()
                .filter_map(|direction| current.step(direction, width, height))
                .find(|neighbor| self.field.distance(*neighbor) == Some(wanted))
            else {
                break;
            };

            self.nodes.push(previous);
            current = previous;
            remaining = wanted;
        }

        self.nodes.reverse();
        &self.nodes
    }

    /// Tiles produced by the last search, from first step to target.
    #[must_use]
    pub fn nodes(&self) -> &[TileCoord] {
        &self.nodes
    }

    /// First tile to step onto, if the last search produced a path.
    #[must_use]
    pub fn first_step(&self) -> Option<TileCoord> {
        self.nodes.first().copied()
    }

    /// Distance field produced by the last search.
    #[must_use]
    pub fn field(&self) -> &DistanceField {
        &self.field
    }

    /// Forgets the last search.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

fn index(width: usize, tile: TileCoord) -> Option<usize> {
    let column = usize::try_from(tile.column()).ok()?;
    let row = usize::try_from(tile.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
