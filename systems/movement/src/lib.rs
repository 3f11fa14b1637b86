#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement resolver that keeps hit-boxes out of walls.
//!
//! A step is applied tentatively, rolled back along the travel direction until
//! the hit-box is clear again, and then classified by probing the four
//! cardinal neighbours of the contact point. A single blocked axis lets the
//! entity slide along the other one at full speed, while corners stop it.
//!
//! The resolver never inspects world state. Callers supply the [`BoxShape`]
//! that should be tested against obstacles together with an obstacle
//! predicate, so entities with a dedicated wall hit-box reuse the same code.

use glam::Vec2;
use stagewalker_core::{BoxShape, Direction, HitBox};

/// Errors raised while resolving movement.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum CollisionError {
    /// No collision-free position exists between the start and the tentative position.
    #[error("rollback exhausted without finding a free position near {position}")]
    RollbackExhausted {
        /// Position the rollback returned to before giving up.
        position: Vec2,
    },
}

/// Classification of the surface that stopped a tentative step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blocking {
    /// The tentative step did not collide.
    Clear,
    /// Only the left or right probe collides.
    Horizontal,
    /// Only the upper or lower probe collides.
    Vertical,
    /// Probes on both axes collide.
    Corner,
    /// The step collided but no probe does, which happens on a diagonal wall tip.
    Diagonal,
}

impl Blocking {
    /// Whether the classification stops the entity for this frame.
    #[must_use]
    pub const fn is_full_stop(self) -> bool {
        matches!(self, Self::Corner | Self::Diagonal)
    }
}

/// Result of resolving a single movement step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveOutcome {
    /// Final position of the entity.
    pub position: Vec2,
    /// Velocity the entity effectively applied this frame.
    pub velocity: Vec2,
    /// Surface classification reported by the probes.
    pub blocking: Blocking,
}

/// Moves an entity one frame towards `direction` at `speed`, sliding along walls.
///
/// `collides` reports whether a candidate hit-box overlaps any obstacle. The
/// entity's hit-box at `position` must already be free of obstacles; when it is
/// not, the rollback cannot find a free position and the step fails.
pub fn resolve_step<F>(
    position: Vec2,
    direction: Vec2,
    speed: f32,
    shape: &BoxShape,
    mut collides: F,
) -> Result<MoveOutcome, CollisionError>
where
    F: FnMut(&HitBox) -> bool,
{
    let direction = direction.normalize_or_zero();
    let velocity = direction * speed;
    let tentative = position + velocity;

    if !collides(&shape.at(tentative)) {
        return Ok(MoveOutcome {
            position: tentative,
            velocity,
            blocking: Blocking::Clear,
        });
    }

    let contact = roll_back(position, tentative, shape, &mut collides)?;
    let blocking = classify(contact, speed, shape, &mut collides);

    let open_axis = match blocking {
        Blocking::Horizontal => Vec2::new(0.0, velocity.y),
        Blocking::Vertical => Vec2::new(velocity.x, 0.0),
        Blocking::Clear | Blocking::Corner | Blocking::Diagonal => Vec2::ZERO,
    };

    if open_axis == Vec2::ZERO {
        return Ok(MoveOutcome {
            position: contact,
            velocity: Vec2::ZERO,
            blocking,
        });
    }

    let slide = open_axis.normalize_or_zero() * speed;
    let target = match blocking {
        Blocking::Horizontal => Vec2::new(contact.x, position.y + slide.y),
        _ => Vec2::new(position.x + slide.x, contact.y),
    };
    let slid = if collides(&shape.at(target)) {
        roll_back(contact, target, shape, &mut collides)?
    } else {
        target
    };

    Ok(MoveOutcome {
        position: slid,
        velocity: slide,
        blocking,
    })
}

/// Applies `velocity` without sliding, rolling back towards `position` on contact.
///
/// Used for entities that travel along a fixed heading, such as pushed blocks.
pub fn translate<F>(
    position: Vec2,
    velocity: Vec2,
    shape: &BoxShape,
    mut collides: F,
) -> Result<Vec2, CollisionError>
where
    F: FnMut(&HitBox) -> bool,
{
    let tentative = position + velocity;
    if collides(&shape.at(tentative)) {
        roll_back(position, tentative, shape, &mut collides)
    } else {
        Ok(tentative)
    }
}

/// Cardinal direction in which a mover touching `obstacle` would push it.
///
/// The four probes used for wall classification are reused: the first probe,
/// in `-x, -y, +x, +y` order, that overlaps `obstacle` and agrees with the
/// sign of `velocity` on its axis names the push direction.
#[must_use]
pub fn push_direction(
    position: Vec2,
    velocity: Vec2,
    speed: f32,
    shape: &BoxShape,
    obstacle: &HitBox,
) -> Option<Direction> {
    if velocity == Vec2::ZERO {
        return None;
    }

    Direction::ALL.into_iter().find(|direction| {
        let heading = direction.unit();
        heading.dot(velocity) > 0.0 && shape.at(position + heading * speed).intersects(obstacle)
    })
}

fn classify<F>(contact: Vec2, speed: f32, shape: &BoxShape, collides: &mut F) -> Blocking
where
    F: FnMut(&HitBox) -> bool,
{
    let mut horizontal = false;
    let mut vertical = false;

    for direction in Direction::ALL {
        if collides(&shape.at(contact + direction.unit() * speed)) {
            if direction.is_horizontal() {
                horizontal = true;
            } else {
                vertical = true;
            }
        }
    }

    match (horizontal, vertical) {
        (true, true) => Blocking::Corner,
        (true, false) => Blocking::Horizontal,
        (false, true) => Blocking::Vertical,
        (false, false) => Blocking::Diagonal,
    }
}

/// Walks from `tentative` back towards `origin` in unit-length steps until clear.
///
/// The final step is clamped so the walk never passes `origin`, which bounds
/// the loop by the travelled distance.
fn roll_back<F>(
    origin: Vec2,
    tentative: Vec2,
    shape: &BoxShape,
    collides: &mut F,
) -> Result<Vec2, CollisionError>
where
    F: FnMut(&HitBox) -> bool,
{
    let heading = (tentative - origin).normalize_or_zero();
    let mut remaining = tentative.distance(origin);
    let mut position = tentative;

    while collides(&shape.at(position)) {
        if remaining <= 0.0 {
            tracing::warn!(x = origin.x, y = origin.y, "movement rollback exhausted");
            return Err(CollisionError::RollbackExhausted { position: origin });
        }

        if remaining <= 1.0 {
            position = origin;
            remaining = 0.0;
        } else {
            position -= heading;
            remaining -= 1.0;
        }
    }

    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f32 = 64.0;

    fn walls(tiles: &[(u32, u32)]) -> Vec<HitBox> {
        tiles
            .iter()
            .map(|&(column, row)| {
                HitBox::from_corner_size(
                    Vec2::new(column as f32 * TILE, row as f32 * TILE),
                    Vec2::splat(TILE),
                )
            })
            .collect()
    }

    fn against(walls: &[HitBox]) -> impl FnMut(&HitBox) -> bool + '_ {
        move |candidate| walls.iter().any(|wall| wall.intersects(candidate))
    }

    #[test]
    fn free_step_applies_full_velocity() {
        let shape = BoxShape::square(48.0);
        let outcome =
            resolve_step(Vec2::new(96.0, 96.0), Vec2::new(3.0, 4.0), 5.0, &shape, |_| false)
                .expect("free space");

        assert_eq!(outcome.blocking, Blocking::Clear);
        assert!((outcome.position - Vec2::new(99.0, 100.0)).length() < 1e-4);
    }

    #[test]
    fn corner_collision_stops_entity() {
        let shape = BoxShape::square(48.0);
        let solid = walls(&[(2, 0), (2, 1), (0, 2), (1, 2), (2, 2)]);
        let start = Vec2::new(100.0, 100.0);

        let outcome =
            resolve_step(start, Vec2::new(1.0, 1.0), 8.0, &shape, against(&solid)).expect("free start");

        assert_eq!(outcome.blocking, Blocking::Corner);
        assert_eq!(outcome.velocity, Vec2::ZERO);
        assert!(!solid.iter().any(|wall| wall.intersects(&shape.at(outcome.position))));
    }

    #[test]
    fn sliding_along_wall_keeps_full_speed() {
        let shape = BoxShape::square(48.0);
        let solid = walls(&[(2, 0), (2, 1), (2, 2), (2, 3)]);
        let start = Vec2::new(104.0, 100.0);

        let outcome =
            resolve_step(start, Vec2::new(1.0, 1.0), 8.0, &shape, against(&solid)).expect("free start");

        assert_eq!(outcome.blocking, Blocking::Horizontal);
        assert!((outcome.position.y - start.y - 8.0).abs() < 1e-4);
        assert!(outcome.position.x <= 104.0 + 1e-4);
        assert_eq!(outcome.velocity, Vec2::new(0.0, 8.0));
    }

    #[test]
    fn rollback_from_overlapping_start_fails() {
        let shape = BoxShape::square(48.0);
        let solid = walls(&[(1, 1)]);

        let error = resolve_step(Vec2::new(96.0, 96.0), Vec2::ZERO, 8.0, &shape, against(&solid))
            .expect_err("start overlaps a wall");

        assert!(matches!(error, CollisionError::RollbackExhausted { .. }));
    }

    #[test]
    fn wall_shape_is_the_only_shape_tested() {
        let feet = BoxShape::centered(Vec2::new(48.0, 24.0)).with_offset(Vec2::new(0.0, 12.0));
        let solid = walls(&[(1, 0)]);
        let start = Vec2::new(96.0, 90.0);

        let outcome =
            resolve_step(start, Vec2::new(0.0, -1.0), 4.0, &feet, against(&solid)).expect("free start");

        assert_eq!(outcome.blocking, Blocking::Clear);
        assert_eq!(outcome.position, Vec2::new(96.0, 86.0));
    }

    #[test]
    fn translate_stops_flush_against_wall() {
        let shape = BoxShape::square(TILE);
        let solid = walls(&[(3, 1)]);
        let start = Vec2::new(159.5, 96.0);

        let position = translate(start, Vec2::new(1.0, 0.0), &shape, against(&solid)).expect("free start");

        assert!(position.x <= 160.0);
        assert!(!solid[0].intersects(&shape.at(position)));
    }

    #[test]
    fn push_direction_follows_travel() {
        let shape = BoxShape::square(48.0);
        let block = HitBox::from_corner_size(Vec2::new(128.0, 64.0), Vec2::splat(TILE));
        let position = Vec2::new(100.0, 96.0);

        assert_eq!(
            push_direction(position, Vec2::new(8.0, 0.0), 8.0, &shape, &block),
            Some(Direction::East)
        );
        assert_eq!(push_direction(position, Vec2::new(-8.0, 0.0), 8.0, &shape, &block), None);
        assert_eq!(push_direction(position, Vec2::ZERO, 8.0, &shape, &block), None);
    }
}
