#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cooldown-gated abilities and the damage sources they spawn.
//!
//! An [`Ability`] is owned by exactly one entity. Activation is accepted only
//! when the owner's frame counter has moved strictly more than the cooldown
//! past the previous activation and when fewer live sources exist than the
//! ability's population cap; every other request is a silent no-op. Accepted
//! activations return a [`SourceSpawn`] that the world turns into an entity.

mod effect;
mod source;

use glam::Vec2;
use rand::Rng;
use stagewalker_core::{AbilityKind, BoxShape, EntityId, Groups};

pub use effect::{Effect, EffectTick, BURN_DAMAGE, BURN_INTERVAL, FLASH_FRAMES, HOOK_PULL};
pub use source::{in_sector, Contact, DamageSource, Hit, Reach};

/// Frames a melee swing keeps its owner from moving.
pub const SLASH_FRAMES: u64 = 15;

/// Constants that define a concrete ability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbilityProfile {
    /// Health removed on first contact.
    pub damage: f32,
    /// Frames that must strictly elapse between activations.
    pub cooldown: u64,
    /// Maximum number of live sources, if the ability is capped.
    pub population_cap: Option<usize>,
    /// Projectile speed in world units per frame.
    pub speed: f32,
    /// Random spray for projectiles or half-width of the melee sector, in radians.
    pub spread: f32,
    /// Frames a struck entity stays afflicted.
    pub duration: u64,
    /// Side of the square projectile hit-box.
    pub hit_box: f32,
}

impl AbilityProfile {
    /// Constants for the provided ability.
    #[must_use]
    pub const fn of(kind: AbilityKind) -> Self {
        match kind {
            AbilityKind::Melee => Self {
                damage: 10.0,
                cooldown: 25,
                population_cap: None,
                speed: 0.0,
                spread: 1.0,
                duration: 30,
                hit_box: 0.0,
            },
            AbilityKind::Fireball => Self {
                damage: 10.0,
                cooldown: 12,
                population_cap: Some(30),
                speed: 8.15,
                spread: 0.1,
                duration: 180,
                hit_box: 16.0,
            },
            AbilityKind::Root => Self {
                damage: 34.0,
                cooldown: 240,
                population_cap: Some(3),
                speed: 3.0,
                spread: 0.0,
                duration: 180,
                hit_box: 32.0,
            },
            AbilityKind::Hook => Self {
                damage: 25.0,
                cooldown: 90,
                population_cap: Some(1),
                speed: 10.0,
                spread: 0.0,
                duration: 5,
                hit_box: 16.0,
            },
        }
    }
}

/// Damage source produced by an accepted activation, ready to be placed in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSpawn {
    /// Spawn position in world units.
    pub position: Vec2,
    /// Velocity applied every frame.
    pub velocity: Vec2,
    /// Source state.
    pub source: DamageSource,
}

/// Ability owned by a single entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Ability {
    kind: AbilityKind,
    cooldown: u64,
    previous_activation: Option<u64>,
    kill_list: Groups,
    damage_list: Groups,
    range: f32,
    live: Vec<EntityId>,
}

impl Ability {
    /// Creates a ready ability with the default cooldown of its kind.
    #[must_use]
    pub fn new(kind: AbilityKind, kill_list: Groups, damage_list: Groups) -> Self {
        Self {
            kind,
            cooldown: AbilityProfile::of(kind).cooldown,
            previous_activation: None,
            kill_list,
            damage_list,
            range: 0.0,
            live: Vec::new(),
        }
    }

    /// Overrides the cooldown in frames.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: u64) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the melee reach in world units.
    #[must_use]
    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    /// Concrete ability.
    #[must_use]
    pub const fn kind(&self) -> AbilityKind {
        self.kind
    }

    /// Cooldown in frames.
    #[must_use]
    pub const fn cooldown(&self) -> u64 {
        self.cooldown
    }

    /// Melee reach in world units.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Groups that destroy spawned sources on contact.
    #[must_use]
    pub const fn kill_list(&self) -> Groups {
        self.kill_list
    }

    /// Groups spawned sources may afflict.
    #[must_use]
    pub const fn damage_list(&self) -> Groups {
        self.damage_list
    }

    /// Owner frame of the last accepted activation.
    #[must_use]
    pub const fn previous_activation(&self) -> Option<u64> {
        self.previous_activation
    }

    /// Number of spawned sources still alive.
    #[must_use]
    pub fn live_sources(&self) -> usize {
        self.live.len()
    }

    /// Whether the cooldown has elapsed at the owner's `frame`.
    #[must_use]
    pub fn off_cooldown(&self, frame: u64) -> bool {
        self.previous_activation
            .map_or(true, |previous| frame.saturating_sub(previous) > self.cooldown)
    }

    /// Requests an activation towards `direction` at the owner's `frame`.
    ///
    /// Returns `None` when the direction is zero, the cooldown has not elapsed,
    /// or the population cap is reached.
    pub fn activate<R>(
        &mut self,
        owner: EntityId,
        frame: u64,
        origin: Vec2,
        direction: Vec2,
        rng: &mut R,
    ) -> Option<SourceSpawn>
    where
        R: Rng + ?Sized,
    {
        let direction = direction.try_normalize()?;
        if !self.off_cooldown(frame) {
            tracing::trace!(ability = %self.kind, frame, "activation rejected on cooldown");
            return None;
        }

        let profile = AbilityProfile::of(self.kind);
        if profile
            .population_cap
            .is_some_and(|cap| self.live.len() >= cap)
        {
            tracing::trace!(ability = %self.kind, live = self.live.len(), "activation rejected at cap");
            return None;
        }

        self.previous_activation = Some(frame);
        Some(self.spawn(owner, origin, direction, profile, rng))
    }

    /// Records a spawned source so it counts against the population cap.
    pub fn track(&mut self, source: EntityId) {
        self.live.push(source);
    }

    /// Forgets a source that left the simulation.
    pub fn forget(&mut self, source: EntityId) {
        self.live.retain(|live| *live != source);
    }

    /// Copy of the ability for a new owner with fresh lists and a ready cooldown.
    ///
    /// The copy runs at the kind's own cadence; per-owner cooldown overrides stay behind.
    #[must_use]
    pub fn inherit(&self, kill_list: Groups, damage_list: Groups) -> Self {
        Self {
            kind: self.kind,
            cooldown: AbilityProfile::of(self.kind).cooldown,
            previous_activation: None,
            kill_list,
            damage_list,
            range: self.range,
            live: Vec::new(),
        }
    }

    fn spawn<R>(
        &self,
        owner: EntityId,
        origin: Vec2,
        direction: Vec2,
        profile: AbilityProfile,
        rng: &mut R,
    ) -> SourceSpawn
    where
        R: Rng + ?Sized,
    {
        let (velocity, reach, lifetime, effect) = match self.kind {
            AbilityKind::Melee => (
                Vec2::ZERO,
                Reach::Sector {
                    facing: direction.y.atan2(direction.x),
                    spread: profile.spread,
                    range_squared: self.range * self.range,
                },
                Some(profile.duration),
                Effect::Flash,
            ),
            AbilityKind::Fireball => {
                let spray = rng.gen_range(-profile.spread..=profile.spread);
                let velocity = Vec2::from_angle(spray).rotate(direction) * profile.speed;
                (
                    velocity,
                    Reach::Box(BoxShape::square(profile.hit_box)),
                    None,
                    Effect::Burn { counter: 0 },
                )
            }
            AbilityKind::Root => (
                direction * profile.speed,
                Reach::Box(BoxShape::square(profile.hit_box)),
                None,
                Effect::Root,
            ),
            AbilityKind::Hook => {
                let velocity = direction * profile.speed;
                (
                    velocity,
                    Reach::Box(BoxShape::square(profile.hit_box)),
                    None,
                    Effect::hook_against(velocity),
                )
            }
        };

        SourceSpawn {
            position: origin,
            velocity,
            source: DamageSource::new(
                self.kind,
                owner,
                profile.damage,
                profile.duration,
                lifetime,
                self.kill_list,
                self.damage_list,
                reach,
                effect,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn fireball() -> Ability {
        Ability::new(AbilityKind::Fireball, Groups::WALLS | Groups::PLAYER, Groups::PLAYER)
    }

    #[test]
    fn activation_inside_cooldown_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ability = fireball();
        let owner = EntityId::new(3);

        let spawned = (0..=12)
            .filter_map(|frame| ability.activate(owner, frame, Vec2::ZERO, Vec2::X, &mut rng))
            .count();

        assert_eq!(spawned, 1);
        assert!(ability
            .activate(owner, 13, Vec2::ZERO, Vec2::X, &mut rng)
            .is_some());
    }

    #[test]
    fn population_cap_blocks_until_sources_are_forgotten() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ability = Ability::new(AbilityKind::Hook, Groups::WALLS, Groups::ENEMIES);
        let owner = EntityId::new(1);

        assert!(ability.activate(owner, 0, Vec2::ZERO, Vec2::Y, &mut rng).is_some());
        ability.track(EntityId::new(9));

        assert!(ability.activate(owner, 500, Vec2::ZERO, Vec2::Y, &mut rng).is_none());
        ability.forget(EntityId::new(9));
        assert!(ability.activate(owner, 500, Vec2::ZERO, Vec2::Y, &mut rng).is_some());
    }

    #[test]
    fn zero_direction_is_ignored() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ability = fireball();

        assert!(ability
            .activate(EntityId::new(1), 0, Vec2::ZERO, Vec2::ZERO, &mut rng)
            .is_none());
        assert_eq!(ability.previous_activation(), None);
    }

    #[test]
    fn fireball_spray_stays_within_spread() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut ability = fireball().with_cooldown(0);

        for frame in 0..30 {
            let spawn = ability
                .activate(EntityId::new(1), frame * 2, Vec2::ZERO, Vec2::X, &mut rng)
                .expect("cooldown elapsed");
            let angle = spawn.velocity.y.atan2(spawn.velocity.x);
            assert!(angle.abs() <= 0.1 + 1e-5);
            assert!((spawn.velocity.length() - 8.15).abs() < 1e-4);
        }
    }

    #[test]
    fn melee_spawns_sector_with_owner_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut ability =
            Ability::new(AbilityKind::Melee, Groups::empty(), Groups::ENEMIES).with_range(100.0);

        let spawn = ability
            .activate(EntityId::new(1), 0, Vec2::new(50.0, 50.0), Vec2::new(0.0, 2.0), &mut rng)
            .expect("ready");

        assert_eq!(spawn.velocity, Vec2::ZERO);
        assert!(spawn.source.follows_owner());
        match spawn.source.reach() {
            Reach::Sector {
                facing,
                range_squared,
                ..
            } => {
                assert!((facing - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
                assert_eq!(range_squared, 10_000.0);
            }
            Reach::Box(_) => panic!("melee must use a sector"),
        }
    }

    #[test]
    fn inherited_copy_is_ready_with_new_lists() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut original = fireball().with_cooldown(32);
        let _ = original.activate(EntityId::new(4), 10, Vec2::ZERO, Vec2::X, &mut rng);
        original.track(EntityId::new(5));

        let copy = original.inherit(Groups::ENEMIES | Groups::WALLS, Groups::ENEMIES);

        assert_eq!(copy.kind(), AbilityKind::Fireball);
        assert_eq!(copy.cooldown(), AbilityProfile::of(AbilityKind::Fireball).cooldown);
        assert_eq!(copy.previous_activation(), None);
        assert_eq!(copy.live_sources(), 0);
        assert_eq!(copy.damage_list(), Groups::ENEMIES);
        assert!(copy.off_cooldown(0));
    }
}
