//! Entity identity and storage types.
//!
//! - [`EntityId`]: dense slot index into the entity table
//! - [`EntityRef`]: slot index plus generation stamp, safe to hold across ticks
//! - [`TeamId`]: allegiance, with reserved "none" and "world" values
//! - [`Entity`]: the component bundle stored in a slot
//!
//! # Stale references
//!
//! Slots are reused greedily, so an id alone does not identify an entity
//! over time. Anything that outlives the current call (owners, parents,
//! targets) is stored as an [`EntityRef`] and checked with
//! `EntityTable::exists` or `EntityTable::resolve` before use.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use skirmish_core::entity::{Entity, TeamId};
//! use skirmish_core::entity::components::Health;
//!
//! let tank = Entity::circle(Vec2::new(100.0, 0.0), 25.0)
//!     .with_team(TeamId::new(2))
//!     .with_health(Health::new(100.0));
//!
//! assert!(tank.is_living());
//! assert!(tank.entity_ref().is_none()); // stamped on allocation
//! ```

pub mod components;

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use sieve::Aabb;

use crate::animation::DeletionAnimation;

pub use components::{
    Health, Physics, PhysicsFlags, Position, PositionFlags, Relations, Style, StyleFlags,
};

/// Slot index in the entity table.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u16);

impl EntityId {
    /// Creates an id from a raw slot index.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Raw slot index.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Slot index as a `usize` for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for EntityId {
    fn from(id: u16) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u16 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Generation-checked reference to an entity.
///
/// Valid while the slot's live generation equals `generation`. Generations
/// run `1..=255` and wrap back to 1; 0 marks an empty slot.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    id: EntityId,
    generation: u8,
}

impl EntityRef {
    /// Builds a reference from its parts.
    #[must_use]
    pub const fn new(id: EntityId, generation: u8) -> Self {
        Self { id, generation }
    }

    /// Slot the reference points at.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Generation captured when the reference was taken.
    #[must_use]
    pub const fn generation(self) -> u8 {
        self.generation
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({}#{})", self.id.0, self.generation)
    }
}

/// Team allegiance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TeamId(u16);

impl TeamId {
    /// Unaligned. Entities on the zero team never count as teammates.
    pub const NONE: Self = Self(0);
    /// The neutral world team owning shapes and walls.
    pub const WORLD: Self = Self(1);

    /// Creates a team id.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Raw team value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true for [`TeamId::NONE`].
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns true if both teams are the same non-zero team.
    #[must_use]
    pub const fn is_ally_of(self, other: TeamId) -> bool {
        self.0 != 0 && self.0 == other.0
    }
}

/// Parent/child bookkeeping.
///
/// Children are attached to the root of their parent chain and listed in the
/// root's `children`; they never take part in collision or integration on
/// their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hierarchy {
    /// Takes part in broad phase and integration.
    pub is_physical: bool,
    /// Attached under a root entity.
    pub is_child: bool,
    /// Root of the parent chain; `None` for roots.
    pub root: Option<EntityId>,
    /// Attached descendants (roots only).
    pub children: Vec<EntityId>,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self {
            is_physical: true,
            is_child: false,
            root: None,
            children: Vec::new(),
        }
    }
}

/// A simulated object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    handle: Option<EntityRef>,
    /// Placement
    pub position: Position,
    /// Shape and collision response
    pub physics: Physics,
    /// Team, owner, parent
    pub relations: Relations,
    /// Presentation state
    pub style: Style,
    /// Present on living entities only.
    pub health: Option<Health>,
    /// Displacement applied per tick
    pub velocity: Vec2,
    /// Parent/child bookkeeping
    pub hierarchy: Hierarchy,
    /// Running deletion animation, if any.
    pub deletion: Option<DeletionAnimation>,
}

impl Entity {
    /// Circle of `radius` centered on `coords`.
    #[must_use]
    pub fn circle(coords: Vec2, radius: f32) -> Self {
        Self {
            position: Position::at(coords),
            physics: Physics {
                size: radius,
                width: radius,
                ..Physics::default()
            },
            ..Self::default()
        }
    }

    /// Rectangle `size` long (x) and `width` tall (y) centered on `coords`.
    #[must_use]
    pub fn rect(coords: Vec2, size: f32, width: f32) -> Self {
        Self {
            position: Position::at(coords),
            physics: Physics {
                size,
                width,
                sides: 2,
                ..Physics::default()
            },
            ..Self::default()
        }
    }

    /// Non-colliding marker at `coords`.
    #[must_use]
    pub fn marker(coords: Vec2) -> Self {
        Self {
            position: Position::at(coords),
            physics: Physics {
                sides: 0,
                ..Physics::default()
            },
            ..Self::default()
        }
    }

    /// Sets the team.
    #[must_use]
    pub fn with_team(mut self, team: TeamId) -> Self {
        self.relations.team = team;
        self
    }

    /// Sets the controlling owner.
    #[must_use]
    pub fn with_owner(mut self, owner: EntityRef) -> Self {
        self.relations.owner = Some(owner);
        self
    }

    /// Makes the entity living.
    #[must_use]
    pub fn with_health(mut self, health: Health) -> Self {
        self.health = Some(health);
        self
    }

    /// Sets the initial velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets the facing angle.
    #[must_use]
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.position.angle = angle;
        self
    }

    /// Adds collision switches.
    #[must_use]
    pub fn with_physics_flags(mut self, flags: PhysicsFlags) -> Self {
        self.physics.flags |= flags;
        self
    }

    /// Adds positional switches.
    #[must_use]
    pub fn with_position_flags(mut self, flags: PositionFlags) -> Self {
        self.position.flags |= flags;
        self
    }

    /// Sets knockback coefficients.
    #[must_use]
    pub fn with_knockback(mut self, push_factor: f32, absorption_factor: f32) -> Self {
        self.physics.push_factor = push_factor;
        self.physics.absorption_factor = absorption_factor;
        self
    }

    /// Reference stamped by the table; `None` before allocation.
    #[must_use]
    pub fn entity_ref(&self) -> Option<EntityRef> {
        self.handle
    }

    pub(crate) fn stamp(&mut self, handle: EntityRef) {
        self.handle = Some(handle);
    }

    /// Returns true if a health pool is attached.
    #[must_use]
    pub fn is_living(&self) -> bool {
        self.health.is_some()
    }

    /// Returns true while the deletion animation runs.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.deletion.is_some()
    }

    /// Broad-phase box around the current position.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.position.coords, self.physics.half_extents())
    }

    /// Starts the deletion animation; a running animation is left alone.
    ///
    /// Living entities drop to zero health.
    pub fn begin_deletion(&mut self) {
        if let Some(health) = self.health.as_mut() {
            health.health = 0.0;
        }
        if self.deletion.is_none() {
            self.deletion = Some(DeletionAnimation::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod id_tests {
        use super::*;

        #[test]
        fn ids_order_by_slot() {
            assert!(EntityId::new(1) < EntityId::new(2));
            assert_eq!(EntityId::new(7).index(), 7);
            assert_eq!(u16::from(EntityId::from(9)), 9);
        }

        #[test]
        fn refs_compare_generation() {
            let a = EntityRef::new(EntityId::new(3), 1);
            let b = EntityRef::new(EntityId::new(3), 2);
            assert_ne!(a, b);
            assert_eq!(a.id(), b.id());
            assert_eq!(format!("{a:?}"), "EntityRef(3#1)");
        }

        #[test]
        fn zero_team_is_never_an_ally() {
            assert!(!TeamId::NONE.is_ally_of(TeamId::NONE));
            assert!(TeamId::new(4).is_ally_of(TeamId::new(4)));
            assert!(!TeamId::new(4).is_ally_of(TeamId::new(5)));
            assert!(TeamId::WORLD.is_ally_of(TeamId::WORLD));
        }
    }

    mod entity_tests {
        use super::*;

        #[test]
        fn builders_set_components() {
            let owner = EntityRef::new(EntityId::new(1), 1);
            let entity = Entity::rect(Vec2::new(5.0, 6.0), 40.0, 10.0)
                .with_team(TeamId::new(3))
                .with_owner(owner)
                .with_angle(1.0)
                .with_knockback(2.0, 0.5)
                .with_physics_flags(PhysicsFlags::IS_SOLID_WALL);

            assert!(entity.physics.is_rect());
            assert_eq!(entity.relations.team, TeamId::new(3));
            assert_eq!(entity.relations.owner, Some(owner));
            assert_eq!(entity.position.angle, 1.0);
            assert_eq!(entity.physics.push_factor, 2.0);
            assert!(entity.physics.flags.contains(PhysicsFlags::IS_SOLID_WALL));
            assert!(entity.hierarchy.is_physical);
        }

        #[test]
        fn aabb_follows_shape() {
            let entity = Entity::rect(Vec2::new(10.0, 0.0), 40.0, 10.0);
            let aabb = entity.aabb();
            assert_eq!(aabb.min(), Vec2::new(-10.0, -5.0));
            assert_eq!(aabb.max(), Vec2::new(30.0, 5.0));
        }

        #[test]
        fn begin_deletion_zeroes_health_once() {
            let mut entity = Entity::circle(Vec2::ZERO, 5.0).with_health(Health::new(10.0));
            entity.begin_deletion();
            assert!(entity.is_deleting());
            assert_eq!(entity.health.as_ref().map(|h| h.health), Some(0.0));

            let frame = entity.deletion.map(|d| d.frame());
            entity.begin_deletion();
            assert_eq!(entity.deletion.map(|d| d.frame()), frame);
        }

        #[test]
        fn entity_serializes() {
            let entity = Entity::circle(Vec2::new(1.0, 2.0), 3.0).with_health(Health::new(5.0));
            let json = serde_json::to_string(&entity).unwrap();
            let back: Entity = serde_json::from_str(&json).unwrap();
            assert_eq!(back, entity);
        }
    }
}
