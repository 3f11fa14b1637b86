#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the stagewalker simulation.
//!
//! The world owns the level grid, the active stage, and every live entity. It
//! is mutated exclusively through [`apply`], which executes one [`Command`] and
//! appends the resulting [`Event`] values, and it is read through [`query`].
//! A [`Command::Tick`] advances every entity by exactly one frame: the player
//! first, then the remaining entities in insertion order, then death checks
//! and the screen-bound check.

mod config;
mod doors;
mod entity;
mod grid;
mod stage;
mod tick;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stagewalker_core::{
    AbilityKind, BoxShape, Command, Directive, EntityId, Event, Groups, HitBox, StageCoord,
    WELCOME_BANNER,
};
use stagewalker_system_combat::Ability;
use stagewalker_system_lifecycle::{Vitals, INHERITED_DAMAGE_LIST, INHERITED_KILL_LIST};
use stagewalker_system_movement::CollisionError;

pub use config::{EnemyConfig, PlayerConfig, SimulationConfig, SpikeConfig};
pub use grid::{LevelError, LevelGrid, Tile};

use entity::{Entity, EntityKind, Player};

const PLAYER_ID: EntityId = EntityId::new(0);

/// Errors raised while applying commands.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The level or a stage request was invalid.
    #[error(transparent)]
    Level(#[from] LevelError),
    /// Movement resolution found no collision-free position.
    #[error(transparent)]
    Collision(#[from] CollisionError),
    /// A door closed onto the player with no free floor tile next to it.
    #[error("door {door} closed on the player but no free tile is adjacent")]
    NoEscapeTile {
        /// Door that was closed.
        door: EntityId,
    },
}

/// Represents the authoritative simulation state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: SimulationConfig,
    grid: LevelGrid,
    directives: Vec<Directive>,
    stage: StageCoord,
    frame: u64,
    next_id: u32,
    player: Player,
    entities: Vec<Option<Entity>>,
    spawned: Vec<Entity>,
    rng: ChaCha8Rng,
}

impl World {
    /// Creates a world for the provided grid; no stage is populated until
    /// [`Command::LoadStage`] is applied.
    pub fn new(
        config: SimulationConfig,
        grid: LevelGrid,
        directives: Vec<Directive>,
    ) -> Result<Self, WorldError> {
        let stage_size = config.stage_size();
        if grid.stage_size() != stage_size {
            return Err(LevelError::ViewportMismatch {
                grid_columns: grid.columns(),
                grid_rows: grid.rows(),
                columns: stage_size.columns(),
                rows: stage_size.rows(),
            }
            .into());
        }

        for directive in &directives {
            if let Directive::Door { stage, from, to } = directive {
                let inside = |column: u32, row: u32| {
                    column < stage_size.columns() && row < stage_size.rows()
                };
                if !inside(from.column(), from.row()) || !inside(to.column(), to.row()) {
                    return Err(LevelError::DoorOutsideStage { stage: *stage }.into());
                }
            }
        }

        let player = Player {
            id: PLAYER_ID,
            position: grid.viewport() * 0.5,
            velocity: Vec2::ZERO,
            direction: Vec2::ZERO,
            aim: Vec2::ZERO,
            shape: BoxShape::square(config.player.hit_box),
            speed: config.player.speed,
            frame_counter: 0,
            vitals: Vitals::new(config.player.health),
            ability: starting_ability(&config),
            ability_active: false,
            slash: 0,
            death: None,
        };

        Ok(Self {
            banner: WELCOME_BANNER,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            grid,
            directives,
            stage: StageCoord::default(),
            frame: 0,
            next_id: PLAYER_ID.get() + 1,
            player,
            entities: Vec::new(),
            spawned: Vec::new(),
        })
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn live_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().flatten()
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .flatten()
            .find(|entity| entity.id == id)
    }

    /// Whether a mover's hit-box overlaps a wall, a closed door, or a block.
    fn blocked(&self, candidate: &HitBox) -> bool {
        self.live_entities()
            .any(|entity| entity.obstructs() && entity.hit_box().intersects(candidate))
    }

    /// Whether an enemy's wall hit-box overlaps `area`.
    fn occupied_by_enemy(&self, area: &HitBox) -> bool {
        self.live_entities().any(|entity| match &entity.kind {
            EntityKind::Enemy(enemy) => enemy.wall_shape.at(entity.position).intersects(area),
            _ => false,
        })
    }
}

fn starting_ability(config: &SimulationConfig) -> Ability {
    match config.player.ability {
        AbilityKind::Melee => Ability::new(AbilityKind::Melee, Groups::empty(), Groups::ENEMIES)
            .with_range(config.player.melee_range),
        kind => Ability::new(kind, INHERITED_KILL_LIST, INHERITED_DAMAGE_LIST),
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
    match command {
        Command::LoadStage { stage } => world.load_stage(stage, true, out_events)?,
        Command::EnterStage { bound } => world.enter_stage(bound, out_events)?,
        Command::Tick => world.tick(out_events)?,
        Command::SteerPlayer { direction } => {
            world.player.direction = direction.normalize_or_zero();
        }
        Command::AimPlayer { target } => world.player.aim = target,
        Command::SetPlayerAbilityActive { active } => world.player.ability_active = active,
        Command::ActivateAbility { entity, direction } => {
            world.activate_ability(entity, direction, out_events);
        }
        Command::Interact => world.interact(out_events)?,
    }

    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use stagewalker_core::{
        AbilityKind, EntityClass, EntityId, EntitySnapshot, StageCoord, TileCoord,
    };

    use super::{entity::EntityKind, LevelGrid, SimulationConfig, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Global frame index.
    #[must_use]
    pub fn frame(world: &World) -> u64 {
        world.frame
    }

    /// Stage currently populated with live entities.
    #[must_use]
    pub fn stage(world: &World) -> StageCoord {
        world.stage
    }

    /// Level grid backing the world.
    #[must_use]
    pub fn grid(world: &World) -> &LevelGrid {
        &world.grid
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Snapshot of the player.
    #[must_use]
    pub fn player(world: &World) -> EntitySnapshot {
        world.player.snapshot()
    }

    /// Ability currently equipped by the player.
    #[must_use]
    pub fn player_ability(world: &World) -> AbilityKind {
        world.player.ability.kind()
    }

    /// Frames left in the player's death countdown, if the player died.
    #[must_use]
    pub fn death_countdown(world: &World) -> Option<u64> {
        world.player.death.map(|death| death.remaining())
    }

    /// Snapshots of every non-player entity in insertion order.
    #[must_use]
    pub fn entities(world: &World) -> Vec<EntitySnapshot> {
        world.live_entities().map(|entity| entity.snapshot()).collect()
    }

    /// Snapshots of the live enemies in insertion order.
    #[must_use]
    pub fn enemies(world: &World) -> Vec<EntitySnapshot> {
        world
            .live_entities()
            .filter(|entity| matches!(entity.class(), EntityClass::Enemy(_)))
            .map(|entity| entity.snapshot())
            .collect()
    }

    /// Snapshot of a single entity, the player included.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        if id == world.player.id {
            return Some(world.player.snapshot());
        }

        world
            .live_entities()
            .find(|entity| entity.id == id)
            .map(|entity| entity.snapshot())
    }

    /// Path an enemy followed during the last frame, from first step to the player's tile.
    #[must_use]
    pub fn enemy_path(world: &World, id: EntityId) -> Option<&[TileCoord]> {
        world.live_entities().find(|entity| entity.id == id).and_then(|entity| {
            match &entity.kind {
                EntityKind::Enemy(enemy) => Some(enemy.pathfinder.nodes()),
                _ => None,
            }
        })
    }
}
