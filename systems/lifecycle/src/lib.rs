#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Health, affliction windows, and death transitions for combatants.
//!
//! Health deductions never kill on their own: the world polls [`Vitals::is_dead`]
//! once per frame after all damage was applied and then asks this crate what
//! the death means for the entity through [`bequeath`] or [`DeathCountdown`].

use glam::Vec2;
use stagewalker_core::{EntityId, Groups};
use stagewalker_system_combat::{Ability, Effect, EffectTick, Hit};

/// Groups that destroy sources spawned by an ability the player inherited.
pub const INHERITED_KILL_LIST: Groups = Groups::ENEMIES.union(Groups::WALLS);
/// Groups afflicted by sources spawned by an ability the player inherited.
pub const INHERITED_DAMAGE_LIST: Groups = Groups::ENEMIES;

/// Time-bounded damage state owned by an afflicted entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affliction {
    source: EntityId,
    started: u64,
    duration: u64,
    effect: Effect,
}

impl Affliction {
    /// Damage source that started the affliction.
    #[must_use]
    pub const fn source(&self) -> EntityId {
        self.source
    }

    /// Entity frame at which the affliction began.
    #[must_use]
    pub const fn started(&self) -> u64 {
        self.started
    }

    /// Length of the affliction window in frames.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.duration
    }

    /// Effect state owned by the afflicted entity.
    #[must_use]
    pub const fn effect(&self) -> Effect {
        self.effect
    }
}

/// Outcome of one affected frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AfflictionTick {
    /// Damage source responsible for the affliction.
    pub source: EntityId,
    /// Consequences produced by the effect this frame.
    pub effect: EffectTick,
    /// Whether the window closed on this frame.
    pub ended: bool,
}

/// Health and damage state of a combatant.
#[derive(Clone, Debug, PartialEq)]
pub struct Vitals {
    health: f32,
    max_health: f32,
    affliction: Option<Affliction>,
    rooted: bool,
}

impl Vitals {
    /// Creates vitals at full health.
    #[must_use]
    pub fn new(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            affliction: None,
            rooted: false,
        }
    }

    /// Remaining health, never below zero.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Upper bound for healing.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Whether the entity is inside an affliction window.
    #[must_use]
    pub const fn damaged(&self) -> bool {
        self.affliction.is_some()
    }

    /// Active affliction, if any.
    #[must_use]
    pub const fn affliction(&self) -> Option<&Affliction> {
        self.affliction.as_ref()
    }

    /// Whether a root holds the entity, from the contact until its window closes.
    #[must_use]
    pub const fn rooted(&self) -> bool {
        self.rooted
    }

    /// Whether the entity must go through its death transition.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Removes `amount` health, clamping at zero, and returns the remaining health.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        self.health = (self.health - amount).max(0.0);
        self.health
    }

    /// Restores `amount` health without exceeding the maximum.
    pub fn add_health(&mut self, amount: f32) -> f32 {
        self.health = (self.health + amount).min(self.max_health);
        self.health
    }

    /// Applies the first contact of a damage source at the entity's `frame`.
    ///
    /// Contacts arriving while an affliction window is open are ignored and
    /// return `None`. Otherwise the affliction is recorded before the health
    /// deduction, and the deducted amount is returned.
    pub fn on_damage(&mut self, frame: u64, hit: &Hit) -> Option<f32> {
        if self.affliction.is_some() {
            return None;
        }

        self.affliction = Some(Affliction {
            source: hit.source,
            started: frame,
            duration: hit.duration,
            effect: hit.effect,
        });
        self.rooted = hit.effect.roots();
        let before = self.health;
        let _ = self.take_damage(hit.damage);
        Some(before - self.health)
    }

    /// Runs the afflicting effect for the entity's `frame` and closes the window when it elapsed.
    pub fn tick_affliction(&mut self, frame: u64) -> Option<AfflictionTick> {
        let Some(affliction) = self.affliction.as_mut() else {
            self.rooted = false;
            return None;
        };

        let elapsed = frame.saturating_sub(affliction.started);
        let effect = affliction.effect.damaging(elapsed);
        let source = affliction.source;
        let ended = elapsed >= affliction.duration;

        self.rooted = effect.immobilize;
        if effect.damage > 0.0 {
            let _ = self.take_damage(effect.damage);
        }
        if ended {
            self.affliction = None;
        }

        Some(AfflictionTick {
            source,
            effect,
            ended,
        })
    }
}

/// What a defeated enemy leaves to the player.
#[derive(Clone, Debug, PartialEq)]
pub struct Bequest {
    /// Copy of the enemy's ability bound to the player's perspective.
    pub ability: Ability,
    /// Health restored to the player.
    pub heal: f32,
    /// Tile centre where a block must be placed when the enemy died rooted.
    pub block_at: Option<Vec2>,
}

/// Death transition of an ability-bearing enemy.
///
/// The player receives a ready copy of `ability` that damages enemies and is
/// destroyed by walls and enemies.
#[must_use]
pub fn bequeath(ability: &Ability, rooted: bool, position: Vec2, heal: f32) -> Bequest {
    Bequest {
        ability: ability.inherit(INHERITED_KILL_LIST, INHERITED_DAMAGE_LIST),
        heal,
        block_at: rooted.then_some(position),
    }
}

/// Fixed-length countdown between the player's death and the game-over request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeathCountdown {
    remaining: u64,
    signalled: bool,
}

impl DeathCountdown {
    /// Starts a countdown of `frames` frames.
    #[must_use]
    pub const fn start(frames: u64) -> Self {
        Self {
            remaining: frames,
            signalled: false,
        }
    }

    /// Frames left before the game-over request.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Advances the countdown and reports `true` exactly once, when it reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.signalled {
            return false;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.signalled = true;
            tracing::debug!("death countdown elapsed");
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagewalker_system_combat::HOOK_PULL;

    fn hit(damage: f32, duration: u64, effect: Effect) -> Hit {
        Hit {
            source: EntityId::new(9),
            damage,
            duration,
            effect,
        }
    }

    #[test]
    fn health_clamps_at_zero_and_caps_at_maximum() {
        let mut vitals = Vitals::new(30.0);

        assert_eq!(vitals.take_damage(50.0), 0.0);
        assert!(vitals.is_dead());
        assert_eq!(vitals.add_health(100.0), 30.0);
    }

    #[test]
    fn second_contact_inside_window_is_ignored() {
        let mut vitals = Vitals::new(100.0);
        let strike = hit(10.0, 30, Effect::Flash);

        assert_eq!(vitals.on_damage(0, &strike), Some(10.0));
        for frame in 1..30 {
            assert_eq!(vitals.on_damage(frame, &strike), None);
            let tick = vitals.tick_affliction(frame).expect("window open");
            assert!(!tick.ended);
        }

        assert!(vitals.tick_affliction(30).is_some_and(|tick| tick.ended));
        assert!(!vitals.damaged());
        assert_eq!(vitals.health(), 90.0);
        assert_eq!(vitals.on_damage(31, &strike), Some(10.0));
    }

    #[test]
    fn root_sets_rooted_until_window_closes() {
        let mut vitals = Vitals::new(100.0);
        let _ = vitals.on_damage(0, &hit(34.0, 3, Effect::Root));

        assert!(vitals.tick_affliction(1).is_some_and(|tick| tick.effect.immobilize));
        assert!(vitals.rooted());
        let _ = vitals.tick_affliction(3);
        assert!(vitals.tick_affliction(4).is_none());
        assert!(!vitals.rooted());
    }

    #[test]
    fn killing_root_leaves_the_entity_rooted() {
        let mut vitals = Vitals::new(30.0);
        let _ = vitals.on_damage(7, &hit(34.0, 180, Effect::Root));

        assert!(vitals.is_dead());
        assert!(vitals.rooted());
    }

    #[test]
    fn hook_overrides_direction_every_frame() {
        let mut vitals = Vitals::new(100.0);
        let _ = vitals.on_damage(0, &hit(25.0, 5, Effect::hook_against(Vec2::new(0.0, 10.0))));

        let tick = vitals.tick_affliction(1).expect("window open");
        assert_eq!(tick.effect.pull, Some(Vec2::new(0.0, -HOOK_PULL)));
        assert_eq!(vitals.health(), 75.0);
    }

    #[test]
    fn countdown_signals_exactly_once() {
        let mut countdown = DeathCountdown::start(3);

        assert!(!countdown.tick());
        assert!(!countdown.tick());
        assert!(countdown.tick());
        assert!(!countdown.tick());
        assert_eq!(countdown.remaining(), 0);
    }

    #[test]
    fn rooted_enemy_leaves_block() {
        let ability = Ability::new(
            stagewalker_core::AbilityKind::Root,
            Groups::PLAYER | Groups::WALLS,
            Groups::PLAYER,
        );
        let position = Vec2::new(96.0, 160.0);

        assert_eq!(bequeath(&ability, true, position, 20.0).block_at, Some(position));
        assert_eq!(bequeath(&ability, false, position, 20.0).block_at, None);
    }
}
