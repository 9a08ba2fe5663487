//! Component groups carried by every entity.
//!
//! Each group mirrors one concern of a simulated object:
//!
//! - [`Position`]: where it is and which way it faces
//! - [`Physics`]: shape, collision switches, knockback coefficients
//! - [`Relations`]: team, controlling owner, attachment parent
//! - [`Style`]: presentation state touched by the simulation (opacity, damage blink)
//! - [`Health`]: present only on living entities
//!
//! Shapes are described by `sides`: `0` marks a non-colliding marker, `2` a
//! rectangle of `size` (along x) by `width` (along y), anything else a
//! circle of radius `size`.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::{EntityId, EntityRef, TeamId};

// =============================================================================
// Flags
// =============================================================================

bitflags! {
    /// Collision behaviour switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PhysicsFlags: u16 {
        /// Never collides with entities of its own (non-zero) team.
        const NO_OWN_TEAM_COLLISION = 1 << 0;
        /// Collides with teammates only when they share its owner.
        const ONLY_SAME_OWNER_COLLISION = 1 << 1;
        /// Solid obstacle; kills owned projectiles of other teams.
        const IS_SOLID_WALL = 1 << 2;
        /// Team base; ignores world-team shapes.
        const IS_BASE = 1 << 3;
        /// Exempt from the arena boundary clamp.
        const CAN_ESCAPE_ARENA = 1 << 4;
        /// Listed in the global (map-visible) index.
        const SHOWS_ON_MAP = 1 << 5;
    }
}

bitflags! {
    /// Positional behaviour switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PositionFlags: u8 {
        /// Ignores wall and base geometry during knockback.
        const CAN_MOVE_THROUGH_WALLS = 1 << 0;
        /// Children keep world-space rotation instead of inheriting this angle.
        const ABSOLUTE_ROTATION = 1 << 1;
    }
}

bitflags! {
    /// Presentation switches written by the simulation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct StyleFlags: u8 {
        /// Toggled once per damaging tick; observers render it as a blink.
        const HAS_BEEN_DAMAGED = 1 << 0;
        /// Suppresses the damage blink.
        const HAS_NO_DMG_INDICATOR = 1 << 1;
    }
}

// =============================================================================
// Position / Physics / Relations / Style
// =============================================================================

/// World placement of an entity (relative to its parent for children).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Center point
    pub coords: Vec2,
    /// Facing in radians
    pub angle: f32,
    /// Positional switches
    pub flags: PositionFlags,
}

impl Position {
    /// Position at `coords` facing angle 0.
    #[must_use]
    pub fn at(coords: Vec2) -> Self {
        Self {
            coords,
            ..Self::default()
        }
    }
}

/// Shape and collision response coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    /// Radius for circles, length along x for rectangles.
    pub size: f32,
    /// Length along y for rectangles; unused by circles.
    pub width: f32,
    /// Side count; 0 = marker, 2 = rectangle, otherwise circle.
    pub sides: u8,
    /// Collision switches
    pub flags: PhysicsFlags,
    /// How hard this entity pushes whatever it touches.
    pub push_factor: f32,
    /// How strongly this entity reacts to being pushed.
    pub absorption_factor: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            size: 1.0,
            width: 1.0,
            sides: 1,
            flags: PhysicsFlags::empty(),
            push_factor: 8.0,
            absorption_factor: 1.0,
        }
    }
}

impl Physics {
    /// Returns true for rectangles.
    #[must_use]
    pub fn is_rect(&self) -> bool {
        self.sides == 2
    }

    /// Half extents of the rotation-agnostic broad-phase box.
    #[must_use]
    pub fn half_extents(&self) -> Vec2 {
        if self.is_rect() {
            Vec2::new(self.size / 2.0, self.width / 2.0)
        } else {
            Vec2::splat(self.size)
        }
    }
}

/// Allegiance and attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Relations {
    /// Team; [`TeamId::NONE`] for unaligned entities.
    pub team: TeamId,
    /// Controlling entity (the tank that fired a bullet, for example).
    pub owner: Option<EntityRef>,
    /// Attachment parent; set through `EntityTable::set_parent`.
    pub parent: Option<EntityRef>,
}

/// Presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// 1.0 = opaque
    pub opacity: f32,
    /// Draw order, assigned on allocation.
    pub z_index: u32,
    /// Presentation switches
    pub flags: StyleFlags,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            z_index: 0,
            flags: StyleFlags::empty(),
        }
    }
}

// =============================================================================
// Health
// =============================================================================

/// Health pool and contact damage parameters of a living entity.
///
/// Two living entities in contact exchange `damage_per_tick` (scaled by the
/// shared multiplier and the opponent's `damage_reduction`) at most once per
/// tick; `exchanged_with` remembers who this entity already traded with and
/// is cleared during integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    /// Current health
    pub health: f32,
    /// Health cap
    pub max_health: f32,
    /// Flat regeneration applied every tick below the cap.
    pub regen_per_tick: f32,
    /// Contact damage dealt per exchange before multipliers.
    pub damage_per_tick: f32,
    /// Multiplier on incoming contact damage; 0 makes the entity immune.
    pub damage_reduction: f32,
    /// Lower bound this entity imposes on the shared multiplier.
    pub min_damage_multiplier: f32,
    /// Upper bound this entity imposes on the shared multiplier.
    pub max_damage_multiplier: f32,
    /// Tick of the most recent damage taken.
    pub last_damage_tick: u64,
    /// Tick the damage blink was last toggled.
    pub last_indicator_tick: Option<u64>,
    /// Opponents already traded with this tick.
    pub exchanged_with: Vec<EntityId>,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Health {
    /// Full pool of `max_health` with default contact parameters.
    #[must_use]
    pub fn new(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
            regen_per_tick: 0.0,
            damage_per_tick: 8.0,
            damage_reduction: 1.0,
            min_damage_multiplier: 1.0,
            max_damage_multiplier: 4.0,
            last_damage_tick: 0,
            last_indicator_tick: None,
            exchanged_with: Vec::new(),
        }
    }

    /// Sets contact damage per exchange.
    #[must_use]
    pub fn with_damage_per_tick(mut self, damage_per_tick: f32) -> Self {
        self.damage_per_tick = damage_per_tick;
        self
    }

    /// Sets the incoming damage multiplier.
    #[must_use]
    pub fn with_damage_reduction(mut self, damage_reduction: f32) -> Self {
        self.damage_reduction = damage_reduction;
        self
    }

    /// Sets per-tick regeneration.
    #[must_use]
    pub fn with_regen(mut self, regen_per_tick: f32) -> Self {
        self.regen_per_tick = regen_per_tick;
        self
    }

    /// Sets the bounds this entity imposes on the shared multiplier.
    #[must_use]
    pub fn with_multipliers(mut self, min: f32, max: f32) -> Self {
        self.min_damage_multiplier = min;
        self.max_damage_multiplier = max;
        self
    }

    /// Returns true once health has reached zero.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.health <= 0.0
    }
}
