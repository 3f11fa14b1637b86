use proptest::prelude::*;
use stagewalker_core::TileCoord;
use stagewalker_system_pathfinding::{DistanceField, Pathfinder};

fn stage_with_tiles() -> impl Strategy<Value = (u32, u32, TileCoord, TileCoord)> {
    (1u32..12, 1u32..10).prop_flat_map(|(width, height)| {
        (
            Just(width),
            Just(height),
            (0..width, 0..height).prop_map(|(column, row)| TileCoord::new(column, row)),
            (0..width, 0..height).prop_map(|(column, row)| TileCoord::new(column, row)),
        )
    })
}

proptest! {
    #[test]
    fn open_stage_distances_are_manhattan((width, height, source, target) in stage_with_tiles()) {
        let mut field = DistanceField::default();
        field.rebuild_with(width, height, source, |_| false);

        for row in 0..height {
            for column in 0..width {
                let tile = TileCoord::new(column, row);
                prop_assert_eq!(field.distance(tile), Some(source.manhattan_distance(tile)));
            }
        }

        let mut pathfinder = Pathfinder::new();
        let path = pathfinder.find_path(width, height, source, target, |_| false);
        prop_assert_eq!(path.len(), source.manhattan_distance(target) as usize);
    }

    #[test]
    fn consecutive_nodes_are_cardinal_neighbours(
        (width, height, source, target) in stage_with_tiles(),
        walls in proptest::collection::hash_set((0u32..12, 0u32..10), 0..30),
    ) {
        let is_blocked = |tile: TileCoord| {
            tile != source && walls.contains(&(tile.column(), tile.row()))
        };

        let mut pathfinder = Pathfinder::new();
        let path = pathfinder.find_path(width, height, source, target, is_blocked).to_vec();

        if let Some(first) = path.first() {
            prop_assert_eq!(first.manhattan_distance(source), 1);
            prop_assert_eq!(path.last(), Some(&target));
        }

        for pair in path.windows(2) {
            prop_assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
        }

        for tile in &path {
            prop_assert!(!is_blocked(*tile));
        }

        let reached = pathfinder.field().distance(target);
        match reached {
            Some(distance) => prop_assert_eq!(path.len(), distance as usize),
            None => prop_assert!(path.is_empty()),
        }
    }
}
