#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the stagewalker simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values describing
//! what happened during the frame. Systems operate on the value types declared
//! here and never own world state themselves.

use std::{fmt, str::FromStr};

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to stagewalker.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clears every non-player entity and repopulates the provided stage.
    LoadStage {
        /// Stage that becomes the active region of the grid.
        stage: StageCoord,
    },
    /// Shifts the active stage across the crossed screen bound and repositions the player.
    EnterStage {
        /// Screen edge that the player crossed.
        bound: Direction,
    },
    /// Advances every live entity by exactly one frame.
    Tick,
    /// Sets the player's desired direction for the next frame.
    SteerPlayer {
        /// Desired direction; normalized by the world, zero stops the player.
        direction: Vec2,
    },
    /// Updates the world-space point the player aims abilities at.
    AimPlayer {
        /// Aim target expressed in world units.
        target: Vec2,
    },
    /// Toggles whether the player activates its ability every frame.
    SetPlayerAbilityActive {
        /// Whether the ability trigger is held.
        active: bool,
    },
    /// Requests that an entity activate its ability towards the provided direction.
    ActivateAbility {
        /// Entity owning the ability.
        entity: EntityId,
        /// Facing or aim direction; normalized by the ability.
        direction: Vec2,
    },
    /// Toggles every door within interaction range of the player.
    Interact,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation advanced one frame.
    TimeAdvanced {
        /// Global frame index reached by the tick.
        frame: u64,
    },
    /// Confirms that a stage was populated with live entities.
    StageLoaded {
        /// Stage that became active.
        stage: StageCoord,
        /// Number of entities created for the stage, excluding a persisting player.
        spawned: usize,
    },
    /// Reports that the player left the viewport through the given edge.
    ScreenBoundCrossed {
        /// Edge that was crossed; adapters respond with [`Command::EnterStage`].
        bound: Direction,
    },
    /// Confirms that an ability created a damage source.
    DamageSourceSpawned {
        /// Identifier of the new damage source.
        source: EntityId,
        /// Entity whose ability spawned the source.
        owner: EntityId,
        /// Ability that produced the source.
        ability: AbilityKind,
    },
    /// Confirms that a damage source left the simulation.
    DamageSourceDestroyed {
        /// Identifier of the destroyed source.
        source: EntityId,
        /// Condition that ended the source's lifecycle.
        reason: DestroyReason,
    },
    /// Reports that an entity lost health to a damage source.
    EntityDamaged {
        /// Entity that took damage.
        entity: EntityId,
        /// Source responsible for the damage.
        source: EntityId,
        /// Amount of health removed.
        amount: f32,
        /// Health remaining after the deduction.
        health: f32,
    },
    /// Confirms that a health-bearing entity was removed after dying.
    EntityDied {
        /// Entity that died.
        entity: EntityId,
    },
    /// Reports that the player inherited the ability of a defeated enemy.
    AbilityInherited {
        /// Enemy that carried the ability.
        from: EntityId,
        /// Ability now equipped by the player.
        ability: AbilityKind,
    },
    /// Reports that a movable block started a translation.
    BlockPushed {
        /// Block that started moving.
        block: EntityId,
        /// Direction of the translation.
        direction: Direction,
    },
    /// Reports that a door changed state.
    DoorToggled {
        /// Door that was toggled.
        door: EntityId,
        /// Whether the door is open after the toggle.
        open: bool,
    },
    /// Announces that the player's health dropped to zero and the death countdown began.
    PlayerDied,
    /// Requests that the surrounding game-state layer leave the playing state.
    GameOverRequested,
}

/// Conditions that end a damage source's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DestroyReason {
    /// The source touched an entity belonging to its kill list.
    KillList,
    /// The source outlived its duration.
    Expired,
    /// The source left the viewport.
    OutOfBounds,
    /// The stage was unloaded while the source was in flight.
    StageUnloaded,
}

/// Unique identifier assigned to a simulated entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cardinal directions, listed in the fixed neighbour-check order `-x, -y, +x, +y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Movement toward decreasing x.
    West,
    /// Movement toward decreasing y.
    North,
    /// Movement toward increasing x.
    East,
    /// Movement toward increasing y.
    South,
}

impl Direction {
    /// All cardinal directions in neighbour-check order.
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::North,
        Direction::East,
        Direction::South,
    ];

    /// Integer offset of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::West => (-1, 0),
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
        }
    }

    /// Unit vector pointing in this direction, in world space.
    #[must_use]
    pub fn unit(self) -> Vec2 {
        let (x, y) = self.offset();
        Vec2::new(x as f32, y as f32)
    }

    /// Reports whether the direction runs along the x axis.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::West | Self::East)
    }
}

/// Location of a tile inside the active stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    column: u32,
    row: u32,
}

impl TileCoord {
    /// Creates a new stage-relative tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Neighbouring tile one step away, if it stays within `columns` × `rows`.
    #[must_use]
    pub fn step(self, direction: Direction, columns: u32, rows: u32) -> Option<TileCoord> {
        let (dx, dy) = direction.offset();
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        (column < columns && row < rows).then_some(TileCoord::new(column, row))
    }

    /// World-space centre of the tile for the provided tile length.
    #[must_use]
    pub fn center(self, tile_size: f32) -> Vec2 {
        Vec2::new(
            (self.column as f32 + 0.5) * tile_size,
            (self.row as f32 + 0.5) * tile_size,
        )
    }
}

/// Index of a stage, the viewport-sized rectangular sub-region of the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageCoord {
    x: i32,
    y: i32,
}

impl StageCoord {
    /// Creates a new stage coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal stage index.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical stage index.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Neighbouring stage across the provided screen edge.
    #[must_use]
    pub const fn shifted(self, bound: Direction) -> Self {
        let (dx, dy) = bound.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for StageCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Dimensions of a stage measured in whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageSize {
    columns: u32,
    rows: u32,
}

impl StageSize {
    /// Creates a new stage size descriptor.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of tile columns in a stage.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows in a stage.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of tiles contained in a stage.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        let columns = usize::try_from(self.columns).unwrap_or(0);
        let rows = usize::try_from(self.rows).unwrap_or(0);
        columns.saturating_mul(rows)
    }

    /// Viewport extent in world units for the provided tile length.
    #[must_use]
    pub fn extent(&self, tile_size: f32) -> Vec2 {
        Vec2::new(self.columns as f32, self.rows as f32) * tile_size
    }
}

/// Axis-aligned rectangle in world units used for collision tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitBox {
    min: Vec2,
    max: Vec2,
}

impl HitBox {
    /// Creates a hit-box centred on `center` with the provided full size.
    #[must_use]
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Creates a hit-box from its upper-left corner and size.
    #[must_use]
    pub fn from_corner_size(corner: Vec2, size: Vec2) -> Self {
        Self {
            min: corner,
            max: corner + size,
        }
    }

    /// Upper-left corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Lower-right corner.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Centre of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Full size of the rectangle.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Reports whether two rectangles overlap with a non-empty area.
    ///
    /// Touching edges do not count as an overlap, so an entity standing flush
    /// against a wall is not considered colliding with it.
    #[must_use]
    pub fn intersects(&self, other: &HitBox) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// Reports whether a point lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }

    /// Rectangle grown by `margin` on every side.
    #[must_use]
    pub fn inflated(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }
}

/// Shape of a hit-box relative to an entity's position.
///
/// Entities carry one shape for damage overlap and may carry a second,
/// distinct shape that is the only one tested against walls.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxShape {
    size: Vec2,
    offset: Vec2,
}

impl BoxShape {
    /// Creates a shape of the provided size centred on the entity position.
    #[must_use]
    pub const fn centered(size: Vec2) -> Self {
        Self {
            size,
            offset: Vec2::ZERO,
        }
    }

    /// Creates a square shape centred on the entity position.
    #[must_use]
    pub const fn square(side: f32) -> Self {
        Self::centered(Vec2::splat(side))
    }

    /// Returns the shape shifted away from the entity position by `offset`.
    #[must_use]
    pub const fn with_offset(self, offset: Vec2) -> Self {
        Self {
            size: self.size,
            offset,
        }
    }

    /// Full size of the shape.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Offset of the shape's centre from the entity position.
    #[must_use]
    pub const fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Hit-box occupied by the shape when the entity stands at `position`.
    #[must_use]
    pub fn at(&self, position: Vec2) -> HitBox {
        HitBox::from_center_size(position + self.offset, self.size)
    }
}

bitflags! {
    /// Named collision groups used as classification keys for collision rules.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Groups: u8 {
        /// The player character.
        const PLAYER = 1 << 0;
        /// Hostile entities.
        const ENEMIES = 1 << 1;
        /// Static obstacles, including closed doors.
        const WALLS = 1 << 2;
        /// Pushable blocks.
        const MOVABLES = 1 << 3;
    }
}

/// Concrete abilities known to the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Short-lived melee sector in front of the owner.
    Melee,
    /// Burning projectile.
    Fireball,
    /// Immobilizing projectile.
    Root,
    /// Pulling projectile.
    Hook,
}

impl AbilityKind {
    /// Every known ability.
    pub const ALL: [AbilityKind; 4] = [Self::Melee, Self::Fireball, Self::Root, Self::Hook];

    /// Stable name used in configuration files and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Fireball => "fireball",
            Self::Root => "root",
            Self::Hook => "hook",
        }
    }
}

impl fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error raised when an ability name does not match any known ability.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown ability `{0}`; expected one of melee, fireball, root, hook")]
pub struct UnknownAbilityError(pub String);

impl FromStr for AbilityKind {
    type Err = UnknownAbilityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownAbilityError(value.to_owned()))
    }
}

/// Enemy archetypes placed from level symbols.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    /// Ranged caster armed with fireballs.
    FireMage,
    /// Ranged caster armed with roots.
    RootMage,
    /// Ranged caster armed with hooks.
    HookMage,
    /// Close-range brawler armed with a melee attack.
    Brute,
}

impl Archetype {
    /// Ability the archetype carries and hands over on death.
    #[must_use]
    pub const fn ability(self) -> AbilityKind {
        match self {
            Self::FireMage => AbilityKind::Fireball,
            Self::RootMage => AbilityKind::Root,
            Self::HookMage => AbilityKind::Hook,
            Self::Brute => AbilityKind::Melee,
        }
    }
}

/// Out-of-band placement directives supplied by the level loader, keyed by stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    /// Door spanning the rectangle between two tiles, inclusive.
    Door {
        /// Stage the door belongs to.
        stage: StageCoord,
        /// First tile covered by the door.
        from: TileCoord,
        /// Last tile covered by the door.
        to: TileCoord,
    },
    /// Stationary turret firing roots.
    ArrowGun {
        /// Stage the turret belongs to.
        stage: StageCoord,
        /// Tile the turret stands on.
        tile: TileCoord,
        /// Firing direction used when the turret does not aim.
        direction: Direction,
        /// Frames between shots.
        firing_delay: u64,
        /// Whether the turret aims at the nearest target instead.
        #[serde(default)]
        aiming: bool,
    },
}

impl Directive {
    /// Stage the directive applies to.
    #[must_use]
    pub const fn stage(&self) -> StageCoord {
        match self {
            Self::Door { stage, .. } | Self::ArrowGun { stage, .. } => *stage,
        }
    }
}

/// Coarse classification of an entity used by read-only views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityClass {
    /// The player character.
    Player,
    /// A hostile entity of the given archetype.
    Enemy(Archetype),
    /// A static wall tile.
    Wall,
    /// A door placed by directive.
    Door,
    /// A pushable block.
    Block,
    /// A damage source spawned by the given ability.
    DamageSource(AbilityKind),
    /// A spike trap.
    Spike,
    /// A stationary turret.
    ArrowGun,
    /// A non-obstructing decoration.
    Ornament,
}

/// Immutable representation of a single entity used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Classification of the entity.
    pub class: EntityClass,
    /// Collision groups the entity belongs to.
    pub groups: Groups,
    /// Position in world units.
    pub position: Vec2,
    /// Velocity applied during the entity's last update.
    pub velocity: Vec2,
    /// Hit-box used for damage overlap.
    pub hit_box: HitBox,
    /// Remaining health for health-bearing entities.
    pub health: Option<f32>,
    /// Whether the entity is inside an affliction window.
    pub damaged: bool,
    /// Entity-local frame counter.
    pub frame_counter: u64,
}
