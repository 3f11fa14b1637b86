//! Door toggling and the push-out of a player caught by a closing door.

use glam::Vec2;
use stagewalker_core::{Direction, EntityId, Event, Groups, HitBox};

use crate::entity::EntityKind;
use crate::{World, WorldError};

/// Frames a door spends opening or closing before it accepts another toggle.
const DOOR_ANIMATION_FRAMES: u64 = 30;

/// Neighbour order tried when a closing door has to push the player out.
const ESCAPE_ORDER: [Direction; 4] = [
    Direction::East,
    Direction::South,
    Direction::North,
    Direction::West,
];

impl World {
    /// Toggles every idle door whose interaction area contains the player.
    pub(crate) fn interact(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        if self.player.is_dead() {
            return Ok(());
        }

        let reach = self.config.interact_range;
        let player = self.player.position;
        let doors: Vec<(EntityId, bool, HitBox)> = self
            .live_entities()
            .filter_map(|entity| match &entity.kind {
                EntityKind::Door(door) if door.timer == 0 => Some((entity.id, door.open, entity.hit_box())),
                _ => None,
            })
            .filter(|(_, _, hit_box)| hit_box.inflated(reach).contains(player))
            .collect();

        for (id, open, hit_box) in doors {
            let closing = open;
            if closing && self.occupied_by_enemy(&hit_box) {
                tracing::debug!(door = %id, "door held open by an enemy");
                continue;
            }

            let escape = if closing && hit_box.intersects(&self.player.hit_box()) {
                Some(self.escape_direction(id, &hit_box)?)
            } else {
                None
            };

            if let Some(entity) = self.entity_mut(id) {
                if let EntityKind::Door(door) = &mut entity.kind {
                    door.open = !open;
                    door.timer = DOOR_ANIMATION_FRAMES;
                }
                entity.groups = if closing { Groups::WALLS } else { Groups::empty() };
            }

            if let Some(direction) = escape {
                self.push_player_out(direction, &hit_box);
            }

            tracing::debug!(door = %id, open = !open, "door toggled");
            out_events.push(Event::DoorToggled { door: id, open: !open });
        }

        Ok(())
    }

    /// First free neighbour of the door's tile, in east, south, north, west order.
    fn escape_direction(&self, door: EntityId, hit_box: &HitBox) -> Result<Direction, WorldError> {
        let size = self.grid.stage_size();
        let probe = Vec2::splat(self.grid.tile_size() * 0.5);
        let tile = self
            .grid
            .tile_of(hit_box.center())
            .ok_or(WorldError::NoEscapeTile { door })?;

        ESCAPE_ORDER
            .into_iter()
            .find(|direction| {
                tile.step(*direction, size.columns(), size.rows())
                    .is_some_and(|next| {
                        let center = self.grid.tile_center(next);
                        !self.grid.is_wall(self.stage, next, false)
                            && !hit_box.contains(center)
                            && !self.blocked(&HitBox::from_center_size(center, probe))
                    })
            })
            .ok_or(WorldError::NoEscapeTile { door })
    }

    fn push_player_out(&mut self, direction: Direction, hit_box: &HitBox) {
        let step = direction.unit();
        let limit = (hit_box.size() + self.player.shape.size()).max_element().ceil() as usize + 1;

        for _ in 0..limit {
            if !self.player.hit_box().intersects(hit_box) {
                break;
            }
            self.player.position += step;
        }
        tracing::debug!(?direction, x = self.player.position.x, y = self.player.position.y, "player pushed out of door");
    }
}
