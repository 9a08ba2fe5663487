//! Read access for consumers running inside a tick.
//!
//! AI controllers and game-mode logic run after the simulation phases of a
//! tick, while the broad-phase grid is still open. [`TickScope`] lends them
//! box queries against that grid plus the entity table (spawners may
//! allocate or release entities there). What they decide stays out of this
//! crate.

use glam::Vec2;
use sieve::{Aabb, HashGrid, PackedIdSet};

use crate::entity::{Entity, EntityId, EntityRef};
use crate::table::EntityTable;
use crate::SimError;

/// How far a consumer can see.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewRange {
    /// Square view of the given half side around the viewer.
    Bounded(f32),
    /// The whole population; skips the grid entirely.
    Unbounded,
}

/// Per-tick query handle given to external consumers.
pub struct TickScope<'a> {
    tick: u64,
    grid: &'a mut HashGrid,
    table: &'a mut EntityTable,
}

impl<'a> TickScope<'a> {
    pub(crate) fn new(tick: u64, grid: &'a mut HashGrid, table: &'a mut EntityTable) -> Self {
        Self { tick, grid, table }
    }

    /// Tick being processed.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The world's entities.
    #[must_use]
    pub fn table(&self) -> &EntityTable {
        self.table
    }

    /// Mutable access for spawners.
    ///
    /// Entities allocated here are not in this tick's grid.
    pub fn table_mut(&mut self) -> &mut EntityTable {
        self.table
    }

    /// Ids that may lie within `range` of `center`.
    ///
    /// A bounded range returns the grid's candidates (a superset of what is
    /// actually in range; callers filter by distance). An unbounded range
    /// returns the shared every-id set, which also covers empty slots, so
    /// callers must look each id up.
    ///
    /// # Errors
    ///
    /// [`SimError::Grid`] if the grid is locked.
    pub fn candidates(&mut self, center: Vec2, range: ViewRange) -> Result<&PackedIdSet, SimError> {
        match range {
            ViewRange::Bounded(half) => {
                let table: &EntityTable = self.table;
                Ok(self.grid.retrieve(table, Aabb::square(center, half))?)
            }
            ViewRange::Unbounded => Ok(PackedIdSet::full()),
        }
    }

    /// First live entity within `range` of `center` accepted by `predicate`.
    ///
    /// Visit order follows grid cells for bounded ranges and ascending ids
    /// for unbounded ones.
    ///
    /// # Errors
    ///
    /// [`SimError::Grid`] if the grid is locked.
    pub fn first_match<P>(
        &mut self,
        center: Vec2,
        range: ViewRange,
        mut predicate: P,
    ) -> Result<Option<EntityRef>, SimError>
    where
        P: FnMut(&Entity) -> bool,
    {
        let table: &EntityTable = self.table;
        let found = match range {
            ViewRange::Bounded(half) => self
                .grid
                .first_match(table, Aabb::square(center, half), |id| {
                    table.get(EntityId::new(id)).is_some_and(&mut predicate)
                })?
                .map(EntityId::new),
            ViewRange::Unbounded => table
                .ids()
                .find(|&id| table.get(id).is_some_and(&mut predicate)),
        };
        Ok(found.and_then(|id| table.get(id)).and_then(Entity::entity_ref))
    }
}
