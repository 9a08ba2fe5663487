//! # Skirmish Core
//!
//! Deterministic simulation core for a real-time multiplayer arena.
//!
//! The crate tracks every simulated object tick by tick, detects and resolves
//! collisions among thousands of moving shapes, and integrates physics. Game
//! rules, AI decisions, networking and observer serialization live outside;
//! they drive the core through [`Simulation`] and read it through
//! [`TickScope`] queries and drained [`TickEvent`]s.
//!
//! ## Architecture
//!
//! - **Entity Table** ([`table`]): bounded slots with generation stamps
//! - **Broad phase** ([`sieve`]): tick-scoped spatial hash grid
//! - **Resolvers** ([`resolver`]): narrow phase, knockback, damage, integration
//! - **Deletion Animator** ([`animation`]): six-frame fade-out before removal
//! - **Tick driver** ([`simulation`]): runs the phases in a fixed order
//!
//! ## Usage
//!
//! ```
//! use glam::Vec2;
//! use skirmish_core::entity::{Entity, Health, TeamId};
//! use skirmish_core::{Simulation, SimulationConfig};
//!
//! let mut sim = Simulation::new(SimulationConfig::default().with_seed(7).with_capacity(64)).unwrap();
//! let a = sim
//!     .table_mut()
//!     .allocate(Entity::circle(Vec2::ZERO, 10.0).with_team(TeamId::new(2)).with_health(Health::new(50.0)))
//!     .unwrap();
//! let b = sim
//!     .table_mut()
//!     .allocate(Entity::circle(Vec2::new(15.0, 0.0), 10.0).with_team(TeamId::new(3)).with_health(Health::new(50.0)))
//!     .unwrap();
//!
//! sim.step().unwrap();
//!
//! let health = |r| sim.table().resolve(r).and_then(|e| e.health.as_ref()).map(|h| h.health);
//! assert!(health(a) < Some(50.0));
//! assert!(health(b) < Some(50.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export sieve for grid types used in the public API
pub use sieve;

pub mod animation;
pub mod config;
pub mod entity;
pub mod event;
pub mod hash;
pub mod query;
pub mod resolver;
pub mod simulation;
pub mod table;

#[cfg(test)]
mod tests;

pub use config::{ArenaConfig, HealthConfig, PhysicsConfig, SimulationConfig};
pub use entity::{Entity, EntityId, EntityRef, TeamId};
pub use event::{EventLog, TickEvent};
pub use query::{TickScope, ViewRange};
pub use simulation::Simulation;
pub use table::EntityTable;

use sieve::GridError;

/// Errors raised by the entity table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// Every slot is taken.
    #[error("out of entity identifiers (capacity {capacity})")]
    OutOfIdentifiers {
        /// Number of slots in the table
        capacity: usize,
    },

    /// The slot holds no entity.
    #[error("entity slot {id} is not occupied")]
    NotPresent {
        /// The empty slot
        id: EntityId,
    },

    /// Attaching the entity would make it its own ancestor.
    #[error("entity {id} cannot be attached under itself")]
    CyclicParent {
        /// The entity being attached
        id: EntityId,
    },
}

/// Errors raised by [`SimulationConfig::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Capacity outside `1..=MAX_ENTITY_COUNT`.
    #[error("capacity {capacity} must be between 1 and {max}")]
    Capacity {
        /// Requested capacity
        capacity: usize,
        /// Largest supported capacity
        max: usize,
    },

    /// Cell shift outside the supported range.
    #[error("cell shift {0} must be between 1 and 16")]
    CellShift(u32),

    /// Arena with a non-positive dimension.
    #[error("arena must have positive dimensions, got {width}x{height}")]
    ArenaSize {
        /// Configured width
        width: f32,
        /// Configured height
        height: f32,
    },

    /// A coefficient outside its allowed range.
    #[error("{name} = {value} is out of range ({expected})")]
    OutOfRange {
        /// Field name
        name: &'static str,
        /// Configured value
        value: f32,
        /// Human-readable valid range
        expected: &'static str,
    },
}

/// Any failure surfaced by the tick driver.
///
/// A [`SimError::Grid`] returned from a step means the tick was abandoned
/// half-way; the world state is no longer trustworthy.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Broad-phase grid misuse.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Entity table failure.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
