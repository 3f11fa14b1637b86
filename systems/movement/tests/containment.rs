use glam::Vec2;
use proptest::prelude::*;
use stagewalker_core::{BoxShape, HitBox};
use stagewalker_system_movement::{resolve_step, Blocking};

const TILE: f32 = 64.0;
const COLUMNS: u32 = 8;
const ROWS: u32 = 6;

fn wall_boxes(walls: &[(u32, u32)]) -> Vec<HitBox> {
    let mut boxes: Vec<HitBox> = walls
        .iter()
        .map(|&(column, row)| {
            HitBox::from_corner_size(
                Vec2::new(column as f32 * TILE, row as f32 * TILE),
                Vec2::splat(TILE),
            )
        })
        .collect();

    for column in 0..COLUMNS {
        for row in [0, ROWS - 1] {
            boxes.push(HitBox::from_corner_size(
                Vec2::new(column as f32 * TILE, row as f32 * TILE),
                Vec2::splat(TILE),
            ));
        }
    }
    for row in 0..ROWS {
        for column in [0, COLUMNS - 1] {
            boxes.push(HitBox::from_corner_size(
                Vec2::new(column as f32 * TILE, row as f32 * TILE),
                Vec2::splat(TILE),
            ));
        }
    }

    boxes
}

proptest! {
    #[test]
    fn hit_box_never_enters_walls(
        walls in proptest::collection::vec((1u32..COLUMNS - 1, 1u32..ROWS - 1), 0..10),
        steps in proptest::collection::vec((-1.0f32..1.0, -1.0f32..1.0), 1..40),
        speed in 0.5f32..12.0,
    ) {
        let start_tile = (3u32, 3u32);
        let walls: Vec<(u32, u32)> = walls.into_iter().filter(|tile| *tile != start_tile).collect();
        let boxes = wall_boxes(&walls);
        let shape = BoxShape::square(48.0);
        let collides = |candidate: &HitBox| boxes.iter().any(|wall| wall.intersects(candidate));

        let mut position = Vec2::new(
            (start_tile.0 as f32 + 0.5) * TILE,
            (start_tile.1 as f32 + 0.5) * TILE,
        );
        prop_assert!(!collides(&shape.at(position)));

        for (x, y) in steps {
            let outcome = resolve_step(position, Vec2::new(x, y), speed, &shape, collides)
                .expect("a free start always has a free rollback target");
            prop_assert!(!collides(&shape.at(outcome.position)));
            if outcome.blocking.is_full_stop() {
                prop_assert_eq!(outcome.velocity, Vec2::ZERO);
            }
            position = outcome.position;
        }
    }

    #[test]
    fn sliding_along_a_flat_wall_keeps_speed(
        offset in 0.0f32..40.0,
        speed in 1.0f32..12.0,
        downward in any::<bool>(),
    ) {
        let wall = HitBox::from_corner_size(Vec2::new(128.0, -1000.0), Vec2::new(64.0, 4000.0));
        let shape = BoxShape::square(48.0);
        let start = Vec2::new(104.0, 500.0 + offset);
        let vertical = if downward { 1.0 } else { -1.0 };

        let outcome = resolve_step(start, Vec2::new(1.0, vertical), speed, &shape, |candidate: &HitBox| {
            wall.intersects(candidate)
        })
        .expect("free start");

        prop_assert_eq!(outcome.blocking, Blocking::Horizontal);
        prop_assert!(((outcome.position.y - start.y).abs() - speed).abs() < 1e-3);
        prop_assert!((outcome.velocity.length() - speed).abs() < 1e-3);
    }
}
