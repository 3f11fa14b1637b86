//! Stage population and transitions.

use glam::Vec2;
use stagewalker_core::{
    AbilityKind, Archetype, BoxShape, DestroyReason, Direction, Directive, EntityId, Event, Groups,
    StageCoord, TileCoord,
};
use stagewalker_system_combat::{Ability, SourceSpawn};
use stagewalker_system_lifecycle::Vitals;
use stagewalker_system_pathfinding::Pathfinder;

use crate::entity::{ArrowGun, Block, Door, Enemy, Entity, EntityKind, Spike};
use crate::grid::{LevelError, Tile};
use crate::{World, WorldError};

/// Groups that destroy sources fired by enemies.
const ENEMY_KILL_LIST: Groups = Groups::WALLS.union(Groups::PLAYER);
/// Groups afflicted by sources fired by enemies.
const ENEMY_DAMAGE_LIST: Groups = Groups::PLAYER;
/// Groups that destroy sources fired by arrow guns.
const GUN_KILL_LIST: Groups = Groups::WALLS.union(Groups::ENEMIES).union(Groups::PLAYER);
/// Groups afflicted by sources fired by arrow guns.
const GUN_DAMAGE_LIST: Groups = Groups::ENEMIES.union(Groups::PLAYER);

impl World {
    /// Replaces every non-player entity with the content of `stage`.
    ///
    /// The player is moved to the stage's spawn tile only when `place_player` is set.
    pub(crate) fn load_stage(
        &mut self,
        stage: StageCoord,
        place_player: bool,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if !self.grid.contains_stage(stage) {
            return Err(LevelError::StageOutOfBounds { stage }.into());
        }

        self.unload(out_events);
        self.stage = stage;

        let size = self.grid.stage_size();
        for row in 0..size.rows() {
            for column in 0..size.columns() {
                let tile = TileCoord::new(column, row);
                let Some(kind) = self.grid.tile(stage, tile) else {
                    continue;
                };
                let center = self.grid.tile_center(tile);

                match kind {
                    Tile::Floor | Tile::SpawnOnly => {}
                    Tile::Wall => self.spawn_tile(center, Groups::WALLS, EntityKind::Wall),
                    Tile::PlayerSpawn => {
                        if place_player {
                            self.player.position = center;
                            self.player.velocity = Vec2::ZERO;
                        }
                    }
                    Tile::Enemy(archetype) => self.spawn_enemy(archetype, center),
                    Tile::Block => self.spawn_block(center),
                    Tile::Spike => self.spawn_tile(center, Groups::empty(), EntityKind::Spike(Spike::default())),
                    Tile::Ornament => self.spawn_tile(center, Groups::empty(), EntityKind::Ornament),
                }
            }
        }

        let directives: Vec<Directive> = self
            .directives
            .iter()
            .filter(|directive| directive.stage() == stage)
            .cloned()
            .collect();
        for directive in directives {
            match directive {
                Directive::Door { from, to, .. } => self.spawn_door(from, to),
                Directive::ArrowGun {
                    tile,
                    direction,
                    firing_delay,
                    aiming,
                    ..
                } => self.spawn_arrow_gun(tile, direction, firing_delay, aiming),
            }
        }

        let spawned = self.entities.len();
        tracing::info!(%stage, spawned, "stage loaded");
        out_events.push(Event::StageLoaded { stage, spawned });
        Ok(())
    }

    /// Moves to the neighbouring stage past `bound` and wraps the player onto the opposite edge.
    pub(crate) fn enter_stage(
        &mut self,
        bound: Direction,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let next = self.stage.shifted(bound);
        self.load_stage(next, false, out_events)?;

        let viewport = self.grid.viewport();
        let position = &mut self.player.position;
        if bound.is_horizontal() {
            position.x = position.x.rem_euclid(viewport.x);
        } else {
            position.y = position.y.rem_euclid(viewport.y);
        }
        tracing::debug!(?bound, x = position.x, y = position.y, "player wrapped into stage");
        Ok(())
    }

    /// Registers an entity created during play; it joins the update order next frame.
    pub(crate) fn spawn_source(&mut self, spawn: SourceSpawn, out_events: &mut Vec<Event>) -> EntityId {
        let id = self.allocate_id();
        let owner = spawn.source.owner();
        let ability = spawn.source.ability();
        self.spawned.push(Entity {
            id,
            groups: Groups::empty(),
            position: spawn.position,
            velocity: spawn.velocity,
            shape: BoxShape::square(0.0),
            frame_counter: 0,
            kind: EntityKind::Source(Box::new(spawn.source)),
        });
        out_events.push(Event::DamageSourceSpawned {
            source: id,
            owner,
            ability,
        });
        id
    }

    /// Detaches a destroyed source from the ability that spawned it.
    pub(crate) fn release_source(&mut self, owner: EntityId, source: EntityId) {
        if owner == self.player.id {
            self.player.ability.forget(source);
        } else if let Some(ability) = self.entity_mut(owner).and_then(Entity::ability_mut) {
            ability.forget(source);
        }
    }

    pub(crate) fn block_entity(&mut self, center: Vec2) -> Entity {
        let id = self.allocate_id();
        Entity {
            id,
            groups: Groups::MOVABLES,
            position: center,
            velocity: Vec2::ZERO,
            shape: BoxShape::square(self.grid.tile_size()),
            frame_counter: 0,
            kind: EntityKind::Block(Block::default()),
        }
    }

    fn unload(&mut self, out_events: &mut Vec<Event>) {
        let entities = std::mem::take(&mut self.entities);
        let spawned = std::mem::take(&mut self.spawned);
        for entity in entities.into_iter().flatten().chain(spawned) {
            if let EntityKind::Source(source) = &entity.kind {
                if source.owner() == self.player.id {
                    self.player.ability.forget(entity.id);
                }
                out_events.push(Event::DamageSourceDestroyed {
                    source: entity.id,
                    reason: DestroyReason::StageUnloaded,
                });
            }
        }
    }

    fn spawn_tile(&mut self, center: Vec2, groups: Groups, kind: EntityKind) {
        let id = self.allocate_id();
        self.entities.push(Some(Entity {
            id,
            groups,
            position: center,
            velocity: Vec2::ZERO,
            shape: BoxShape::square(self.grid.tile_size()),
            frame_counter: 0,
            kind,
        }));
    }

    fn spawn_block(&mut self, center: Vec2) {
        let block = self.block_entity(center);
        self.entities.push(Some(block));
    }

    fn spawn_enemy(&mut self, archetype: Archetype, center: Vec2) {
        let tuning = self.config.enemy(archetype).clone();
        let mut ability = Ability::new(archetype.ability(), ENEMY_KILL_LIST, ENEMY_DAMAGE_LIST)
            .with_range(tuning.range);
        if let Some(cooldown) = tuning.cooldown {
            ability = ability.with_cooldown(cooldown);
        }

        let side = tuning.hit_box;
        let id = self.allocate_id();
        self.entities.push(Some(Entity {
            id,
            groups: Groups::ENEMIES,
            position: center,
            velocity: Vec2::ZERO,
            shape: BoxShape::square(side),
            frame_counter: 0,
            kind: EntityKind::Enemy(Box::new(Enemy {
                archetype,
                vitals: Vitals::new(tuning.health),
                ability,
                speed: tuning.speed,
                range: tuning.range,
                wall_shape: BoxShape::centered(Vec2::new(side, side * 0.5))
                    .with_offset(Vec2::new(0.0, side * 0.25)),
                direction: Vec2::ZERO,
                pathfinder: Pathfinder::new(),
            })),
        }));
    }

    fn spawn_door(&mut self, from: TileCoord, to: TileCoord) {
        let tile_size = self.grid.tile_size();
        let low = Vec2::new(from.column().min(to.column()) as f32, from.row().min(to.row()) as f32);
        let high = Vec2::new(from.column().max(to.column()) as f32, from.row().max(to.row()) as f32);
        let size = (high - low + Vec2::ONE) * tile_size;

        let id = self.allocate_id();
        self.entities.push(Some(Entity {
            id,
            groups: Groups::WALLS,
            position: low * tile_size + size * 0.5,
            velocity: Vec2::ZERO,
            shape: BoxShape::centered(size),
            frame_counter: 0,
            kind: EntityKind::Door(Door::default()),
        }));
    }

    fn spawn_arrow_gun(&mut self, tile: TileCoord, heading: Direction, firing_delay: u64, aiming: bool) {
        let center = self.grid.tile_center(tile);
        let gun = ArrowGun {
            ability: Ability::new(AbilityKind::Root, GUN_KILL_LIST, GUN_DAMAGE_LIST)
                .with_cooldown(0),
            heading,
            firing_delay,
            aiming,
        };
        self.spawn_tile(center, Groups::empty(), EntityKind::ArrowGun(gun));
    }
}

#[cfg(test)]
mod tests {
    use stagewalker_core::{Command, EntityClass};

    use crate::{apply, query, LevelGrid, SimulationConfig};

    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            stage_columns: 4,
            stage_rows: 3,
            ..SimulationConfig::default()
        }
    }

    fn world(rows: [&str; 3], directives: Vec<Directive>) -> World {
        let config = small_config();
        let grid = LevelGrid::from_rows(rows, config.stage_size(), config.tile_size).expect("rectangular");
        World::new(config, grid, directives).expect("valid world")
    }

    #[test]
    fn load_populates_tiles_in_row_major_order() {
        let mut world = world(["#..#....", "P.F.....", "#^OB...."], Vec::new());
        let mut events = Vec::new();

        apply(&mut world, Command::LoadStage { stage: StageCoord::new(0, 0) }, &mut events).expect("stage exists");

        let classes: Vec<EntityClass> = query::entities(&world).iter().map(|entity| entity.class).collect();
        assert_eq!(
            classes,
            vec![
                EntityClass::Wall,
                EntityClass::Wall,
                EntityClass::Enemy(Archetype::FireMage),
                EntityClass::Wall,
                EntityClass::Spike,
                EntityClass::Ornament,
                EntityClass::Block,
            ]
        );
        assert_eq!(query::player(&world).position, Vec2::new(32.0, 96.0));
        assert_eq!(
            events,
            vec![Event::StageLoaded {
                stage: StageCoord::new(0, 0),
                spawned: 7
            }]
        );
    }

    #[test]
    fn missing_stage_leaves_world_untouched() {
        let mut world = world(["#..#", "P...", "#..#"], Vec::new());
        let mut events = Vec::new();
        apply(&mut world, Command::LoadStage { stage: StageCoord::new(0, 0) }, &mut events).expect("stage exists");

        let error = apply(&mut world, Command::LoadStage { stage: StageCoord::new(1, 0) }, &mut events)
            .expect_err("no such stage");

        assert!(matches!(
            error,
            WorldError::Level(LevelError::StageOutOfBounds { .. })
        ));
        assert_eq!(query::entities(&world).len(), 4);
        assert_eq!(query::stage(&world), StageCoord::new(0, 0));
    }

    #[test]
    fn doors_span_their_tiles_and_start_closed() {
        let door = Directive::Door {
            stage: StageCoord::new(0, 0),
            from: TileCoord::new(3, 0),
            to: TileCoord::new(1, 0),
        };
        let mut world = world(["....", "P...", "...."], vec![door]);
        let mut events = Vec::new();

        apply(&mut world, Command::LoadStage { stage: StageCoord::new(0, 0) }, &mut events).expect("stage exists");

        let door = query::entities(&world)
            .into_iter()
            .find(|entity| entity.class == EntityClass::Door)
            .expect("door spawned");
        assert_eq!(door.groups, Groups::WALLS);
        assert_eq!(door.hit_box.min(), Vec2::new(64.0, 0.0));
        assert_eq!(door.hit_box.max(), Vec2::new(256.0, 64.0));
    }

    #[test]
    fn enemies_carry_lower_half_wall_shape() {
        let mut world = world(["....", "..M.", "...."], Vec::new());
        let mut events = Vec::new();
        apply(&mut world, Command::LoadStage { stage: StageCoord::new(0, 0) }, &mut events).expect("stage exists");

        let Some(Some(entity)) = world.entities.first() else {
            panic!("enemy spawned");
        };
        let EntityKind::Enemy(enemy) = &entity.kind else {
            panic!("enemy spawned");
        };
        let wall_box = enemy.wall_shape.at(entity.position);

        assert_eq!(wall_box.min(), Vec2::new(136.0, 96.0));
        assert_eq!(wall_box.max(), Vec2::new(184.0, 120.0));
        assert_eq!(enemy.ability.kill_list(), Groups::WALLS | Groups::PLAYER);
        assert_eq!(enemy.ability.damage_list(), Groups::PLAYER);
        assert_eq!(enemy.ability.range(), 100.0);
    }
}
