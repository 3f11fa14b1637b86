//! Tunable simulation constants loaded from configuration files.

use serde::{Deserialize, Serialize};
use stagewalker_core::{AbilityKind, Archetype, StageSize};

/// Top-level simulation configuration.
///
/// Every field has a default, so partial files only override what they name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Side length of a tile in world units.
    pub tile_size: f32,
    /// Viewport width in tiles.
    pub stage_columns: u32,
    /// Viewport height in tiles.
    pub stage_rows: u32,
    /// Seed for the deterministic random number generator.
    pub rng_seed: u64,
    /// Player tuning.
    pub player: PlayerConfig,
    /// Fire mage tuning.
    pub fire_mage: EnemyConfig,
    /// Root mage tuning.
    pub root_mage: EnemyConfig,
    /// Hook mage tuning.
    pub hook_mage: EnemyConfig,
    /// Brute tuning.
    pub brute: EnemyConfig,
    /// Distance in world units a pushed block travels per frame.
    pub block_speed: f32,
    /// Reach of the interact command in world units.
    pub interact_range: f32,
    /// Spike trap tuning.
    pub spike: SpikeConfig,
}

impl SimulationConfig {
    /// Viewport dimensions in tiles.
    #[must_use]
    pub const fn stage_size(&self) -> StageSize {
        StageSize::new(self.stage_columns, self.stage_rows)
    }

    /// Tuning for the provided archetype.
    #[must_use]
    pub const fn enemy(&self, archetype: Archetype) -> &EnemyConfig {
        match archetype {
            Archetype::FireMage => &self.fire_mage,
            Archetype::RootMage => &self.root_mage,
            Archetype::HookMage => &self.hook_mage,
            Archetype::Brute => &self.brute,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tile_size: 64.0,
            stage_columns: 11,
            stage_rows: 8,
            rng_seed: 0x5eed_0f_57a9e,
            player: PlayerConfig::default(),
            fire_mage: EnemyConfig {
                speed: 3.0,
                health: 50.0,
                range: 200.0,
                cooldown: Some(32),
                hit_box: 48.0,
            },
            root_mage: EnemyConfig {
                speed: 3.0,
                health: 50.0,
                range: 200.0,
                cooldown: Some(240),
                hit_box: 48.0,
            },
            hook_mage: EnemyConfig {
                speed: 3.0,
                health: 50.0,
                range: 200.0,
                cooldown: Some(90),
                hit_box: 48.0,
            },
            brute: EnemyConfig {
                speed: 3.0,
                health: 100.0,
                range: 100.0,
                cooldown: None,
                hit_box: 48.0,
            },
            block_speed: 1.0,
            interact_range: 64.0,
            spike: SpikeConfig::default(),
        }
    }
}

/// Player tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Distance travelled per frame.
    pub speed: f32,
    /// Starting and maximum health.
    pub health: f32,
    /// Side of the square hit-box.
    pub hit_box: f32,
    /// Reach of the melee sector.
    pub melee_range: f32,
    /// Frames between death and the game-over request.
    pub death_countdown: u64,
    /// Health restored when inheriting an ability.
    pub inheritance_heal: f32,
    /// Ability equipped at start.
    pub ability: AbilityKind,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 8.0,
            health: 100.0,
            hit_box: 48.0,
            melee_range: 100.0,
            death_countdown: 90,
            inheritance_heal: 20.0,
            ability: AbilityKind::Melee,
        }
    }
}

/// Tuning for one enemy archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnemyConfig {
    /// Distance travelled per frame.
    pub speed: f32,
    /// Starting health.
    pub health: f32,
    /// Distance within which the enemy stops approaching and attacks.
    pub range: f32,
    /// Ability cooldown override in frames.
    #[serde(default)]
    pub cooldown: Option<u64>,
    /// Side of the square hit-box.
    pub hit_box: f32,
}

/// Spike trap tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpikeConfig {
    /// Health removed per hit.
    pub damage: f32,
    /// Frames between raising and lowering.
    pub cycle: u64,
    /// Frames before a spike that struck can strike again; also the affliction window.
    pub rearm: u64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            damage: 10.0,
            cycle: 180,
            rearm: 180,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: SimulationConfig = toml::from_str(
            r#"
                rng_seed = 42
                [player]
                ability = "fireball"
                [brute]
                speed = 2.0
                health = 80.0
                range = 90.0
                hit_box = 40.0
            "#,
        )
        .expect("valid configuration");

        assert_eq!(config.rng_seed, 42);
        assert_eq!(config.player.ability, AbilityKind::Fireball);
        assert_eq!(config.player.speed, 8.0);
        assert_eq!(config.enemy(Archetype::Brute).health, 80.0);
        assert_eq!(config.enemy(Archetype::FireMage).cooldown, Some(32));
        assert_eq!(config.stage_size(), StageSize::new(11, 8));
    }

    #[test]
    fn unknown_ability_is_rejected() {
        let result: Result<SimulationConfig, _> = toml::from_str(
            r#"
                [player]
                ability = "lightning"
            "#,
        );

        assert!(result.is_err());
    }
}
