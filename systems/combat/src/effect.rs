//! Status effects applied by damage sources to afflicted entities.

use glam::Vec2;

/// Frames after the first hit during which only the hit flash is shown.
pub const FLASH_FRAMES: u64 = 4;
/// Health removed by every burn tick.
pub const BURN_DAMAGE: f32 = 2.0;
/// Frames between burn ticks once the flash window elapsed.
pub const BURN_INTERVAL: u32 = 60;
/// Strength of the pull applied by a hook.
pub const HOOK_PULL: f32 = 12.0;

/// Effect carried by a damage source and copied onto the entity it afflicts.
///
/// The afflicted entity owns its copy, so a burn keeps ticking after the
/// fireball that started it has been destroyed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Effect {
    /// Hit feedback only; no numeric consequence.
    Flash,
    /// Damage over time.
    Burn {
        /// Frames counted since the flash window elapsed, modulo the burn interval.
        counter: u32,
    },
    /// Immobilizes the afflicted entity.
    Root,
    /// Drags the afflicted entity back along the hook's flight path.
    Hook {
        /// Displacement applied every affected frame.
        pull: Vec2,
    },
}

/// Consequences of one affected frame, applied by the world to the afflicted entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectTick {
    /// Health to remove this frame.
    pub damage: f32,
    /// Whether velocity and desired direction must be zeroed.
    pub immobilize: bool,
    /// Desired direction override, scaled by the pull strength.
    pub pull: Option<Vec2>,
}

impl Effect {
    /// Hook effect pulling against a projectile travelling with `velocity`.
    #[must_use]
    pub fn hook_against(velocity: Vec2) -> Self {
        Self::Hook {
            pull: -HOOK_PULL * velocity.normalize_or_zero(),
        }
    }

    /// Advances the effect by one affected frame.
    ///
    /// `elapsed` counts the afflicted entity's frames since the first hit.
    pub fn damaging(&mut self, elapsed: u64) -> EffectTick {
        match self {
            Self::Flash => EffectTick::default(),
            Self::Burn { counter } => {
                if elapsed <= FLASH_FRAMES {
                    return EffectTick::default();
                }

                *counter += 1;
                if *counter % BURN_INTERVAL == 0 {
                    *counter = 0;
                    EffectTick {
                        damage: BURN_DAMAGE,
                        ..EffectTick::default()
                    }
                } else {
                    EffectTick::default()
                }
            }
            Self::Root => EffectTick {
                immobilize: true,
                ..EffectTick::default()
            },
            Self::Hook { pull } => EffectTick {
                pull: Some(*pull),
                ..EffectTick::default()
            },
        }
    }

    /// Whether the effect marks the afflicted entity as rooted.
    #[must_use]
    pub const fn roots(&self) -> bool {
        matches!(self, Self::Root)
    }
}
