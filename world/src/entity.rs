//! Live entities owned by the world.

use glam::Vec2;
use stagewalker_core::{
    Archetype, BoxShape, Direction, EntityClass, EntityId, EntitySnapshot, Groups, HitBox,
};
use stagewalker_system_combat::{Ability, DamageSource};
use stagewalker_system_lifecycle::{DeathCountdown, Vitals};
use stagewalker_system_pathfinding::Pathfinder;

/// The player character. It persists across stage loads.
#[derive(Clone, Debug)]
pub(crate) struct Player {
    pub(crate) id: EntityId,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) direction: Vec2,
    pub(crate) aim: Vec2,
    pub(crate) shape: BoxShape,
    pub(crate) speed: f32,
    pub(crate) frame_counter: u64,
    pub(crate) vitals: Vitals,
    pub(crate) ability: Ability,
    pub(crate) ability_active: bool,
    pub(crate) slash: u64,
    pub(crate) death: Option<DeathCountdown>,
}

impl Player {
    pub(crate) fn is_dead(&self) -> bool {
        self.death.is_some()
    }

    pub(crate) fn hit_box(&self) -> HitBox {
        self.shape.at(self.position)
    }

    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            class: EntityClass::Player,
            groups: Groups::PLAYER,
            position: self.position,
            velocity: self.velocity,
            hit_box: self.hit_box(),
            health: Some(self.vitals.health()),
            damaged: self.vitals.damaged(),
            frame_counter: self.frame_counter,
        }
    }
}

/// Non-player entity populated from the stage or spawned during play.
#[derive(Clone, Debug)]
pub(crate) struct Entity {
    pub(crate) id: EntityId,
    pub(crate) groups: Groups,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) shape: BoxShape,
    pub(crate) frame_counter: u64,
    pub(crate) kind: EntityKind,
}

#[derive(Clone, Debug)]
pub(crate) enum EntityKind {
    Wall,
    Ornament,
    Door(Door),
    Block(Block),
    Enemy(Box<Enemy>),
    Source(Box<DamageSource>),
    Spike(Spike),
    ArrowGun(ArrowGun),
}

#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) archetype: Archetype,
    pub(crate) vitals: Vitals,
    pub(crate) ability: Ability,
    pub(crate) speed: f32,
    pub(crate) range: f32,
    pub(crate) wall_shape: BoxShape,
    pub(crate) direction: Vec2,
    pub(crate) pathfinder: Pathfinder,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Door {
    pub(crate) open: bool,
    pub(crate) timer: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Block {
    pub(crate) heading: Option<Direction>,
    pub(crate) remaining: u64,
}

impl Block {
    pub(crate) fn is_moving(&self) -> bool {
        self.remaining > 0
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Spike {
    pub(crate) up: bool,
    pub(crate) rearm: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct ArrowGun {
    pub(crate) ability: Ability,
    pub(crate) heading: Direction,
    pub(crate) firing_delay: u64,
    pub(crate) aiming: bool,
}

impl Entity {
    pub(crate) fn hit_box(&self) -> HitBox {
        self.shape.at(self.position)
    }

    pub(crate) fn vitals(&self) -> Option<&Vitals> {
        match &self.kind {
            EntityKind::Enemy(enemy) => Some(&enemy.vitals),
            _ => None,
        }
    }

    pub(crate) fn vitals_mut(&mut self) -> Option<&mut Vitals> {
        match &mut self.kind {
            EntityKind::Enemy(enemy) => Some(&mut enemy.vitals),
            _ => None,
        }
    }

    pub(crate) fn ability_mut(&mut self) -> Option<&mut Ability> {
        match &mut self.kind {
            EntityKind::Enemy(enemy) => Some(&mut enemy.ability),
            EntityKind::ArrowGun(gun) => Some(&mut gun.ability),
            _ => None,
        }
    }

    /// Whether movers treat the entity as a solid obstacle.
    pub(crate) fn obstructs(&self) -> bool {
        self.groups.intersects(Groups::WALLS | Groups::MOVABLES)
    }

    pub(crate) fn class(&self) -> EntityClass {
        match &self.kind {
            EntityKind::Wall => EntityClass::Wall,
            EntityKind::Ornament => EntityClass::Ornament,
            EntityKind::Door(_) => EntityClass::Door,
            EntityKind::Block(_) => EntityClass::Block,
            EntityKind::Enemy(enemy) => EntityClass::Enemy(enemy.archetype),
            EntityKind::Source(source) => EntityClass::DamageSource(source.ability()),
            EntityKind::Spike(_) => EntityClass::Spike,
            EntityKind::ArrowGun(_) => EntityClass::ArrowGun,
        }
    }

    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        let hit_box = match &self.kind {
            EntityKind::Source(source) => source
                .hit_box(self.position)
                .unwrap_or_else(|| HitBox::from_center_size(self.position, Vec2::ZERO)),
            _ => self.hit_box(),
        };

        EntitySnapshot {
            id: self.id,
            class: self.class(),
            groups: self.groups,
            position: self.position,
            velocity: self.velocity,
            hit_box,
            health: self.vitals().map(Vitals::health),
            damaged: self.vitals().is_some_and(Vitals::damaged),
            frame_counter: self.frame_counter,
        }
    }
}
