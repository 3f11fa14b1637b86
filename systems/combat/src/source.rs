//! Damage sources spawned by abilities and the predicates that decide what they touch.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use stagewalker_core::{AbilityKind, BoxShape, EntityId, Groups, HitBox};

use crate::Effect;

/// Region a damage source covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reach {
    /// Angular sector anchored on the source position.
    Sector {
        /// Facing angle in radians, measured from the positive x axis.
        facing: f32,
        /// Half-width of the sector in radians.
        spread: f32,
        /// Squared reach of the sector.
        range_squared: f32,
    },
    /// Axis-aligned hit-box centred on the source position.
    Box(BoxShape),
}

/// Reaction of a damage source to touching an entity of the given groups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Contact {
    /// The source must be destroyed.
    pub destroys: bool,
    /// The entity must be afflicted.
    pub afflicts: bool,
}

/// Payload delivered to an entity struck by a damage source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Entity responsible for the hit.
    pub source: EntityId,
    /// Health removed on first contact.
    pub damage: f32,
    /// Frames the struck entity stays afflicted.
    pub duration: u64,
    /// Effect copied onto the struck entity.
    pub effect: Effect,
}

/// Entity that damages others on contact for a bounded affliction window.
#[derive(Clone, Debug, PartialEq)]
pub struct DamageSource {
    ability: AbilityKind,
    owner: EntityId,
    damage: f32,
    duration: u64,
    lifetime: Option<u64>,
    kill_list: Groups,
    damage_list: Groups,
    reach: Reach,
    effect: Effect,
    age: u64,
}

impl DamageSource {
    /// Creates a damage source. Sources without a `lifetime` live until a
    /// kill-list contact or until they leave the viewport.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        ability: AbilityKind,
        owner: EntityId,
        damage: f32,
        duration: u64,
        lifetime: Option<u64>,
        kill_list: Groups,
        damage_list: Groups,
        reach: Reach,
        effect: Effect,
    ) -> Self {
        Self {
            ability,
            owner,
            damage,
            duration,
            lifetime,
            kill_list,
            damage_list,
            reach,
            effect,
            age: 0,
        }
    }

    /// Ability that spawned the source.
    #[must_use]
    pub const fn ability(&self) -> AbilityKind {
        self.ability
    }

    /// Entity whose ability spawned the source.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// Health removed on first contact.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Frames a struck entity stays afflicted.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.duration
    }

    /// Groups that destroy the source on contact.
    #[must_use]
    pub const fn kill_list(&self) -> Groups {
        self.kill_list
    }

    /// Groups the source may afflict.
    #[must_use]
    pub const fn damage_list(&self) -> Groups {
        self.damage_list
    }

    /// Region the source covers.
    #[must_use]
    pub const fn reach(&self) -> Reach {
        self.reach
    }

    /// Sector sources ride along with their owner.
    #[must_use]
    pub const fn follows_owner(&self) -> bool {
        matches!(self.reach, Reach::Sector { .. })
    }

    /// Hit-box occupied at `position`, if the source uses box overlap.
    #[must_use]
    pub fn hit_box(&self, position: Vec2) -> Option<HitBox> {
        match self.reach {
            Reach::Box(shape) => Some(shape.at(position)),
            Reach::Sector { .. } => None,
        }
    }

    /// Whether the source at `position` touches an entity at `target` occupying `target_box`.
    #[must_use]
    pub fn touches(&self, position: Vec2, target: Vec2, target_box: &HitBox) -> bool {
        match self.reach {
            Reach::Sector {
                facing,
                spread,
                range_squared,
            } => in_sector(position, facing, spread, range_squared, target),
            Reach::Box(shape) => shape.at(position).intersects(target_box),
        }
    }

    /// Reaction to touching an entity belonging to `groups`.
    #[must_use]
    pub fn contact(&self, groups: Groups) -> Contact {
        Contact {
            destroys: self.kill_list.intersects(groups),
            afflicts: self.damage_list.intersects(groups),
        }
    }

    /// Payload delivered when the source with identifier `id` strikes an entity.
    #[must_use]
    pub fn hit(&self, id: EntityId) -> Hit {
        Hit {
            source: id,
            damage: self.damage,
            duration: self.duration,
            effect: self.effect,
        }
    }

    /// Ages the source by one frame and reports whether its lifetime elapsed.
    pub fn age(&mut self) -> bool {
        self.age += 1;
        self.lifetime.is_some_and(|lifetime| self.age > lifetime)
    }
}

/// Whether `point` lies inside the sector anchored on `origin`.
///
/// The angular test uses the wrapped difference to `facing`, so sectors that
/// straddle the negative x axis behave like any other.
#[must_use]
pub fn in_sector(origin: Vec2, facing: f32, spread: f32, range_squared: f32, point: Vec2) -> bool {
    let relative = point - origin;
    if relative.length_squared() >= range_squared {
        return false;
    }

    let angle = relative.y.atan2(relative.x);
    let mut delta = (angle - facing) % TAU;
    if delta > PI {
        delta -= TAU;
    } else if delta < -PI {
        delta += TAU;
    }

    delta.abs() < spread
}
