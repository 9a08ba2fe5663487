//! Entity table: bounded slot storage with generation stamping.
//!
//! The table owns every entity of one world. It hands out the lowest free
//! slot on allocation, stamps each allocation with a per-slot generation, and
//! keeps the parent/child and map-visibility indices consistent on release.
//!
//! # Generations
//!
//! Each slot carries a stamp counter that is bumped on every allocation
//! (`1..=255`, wrapping back to 1). A live entity records the stamp it was
//! allocated with in its [`EntityRef`]. Releasing a slot empties it, so every
//! reference into it fails [`EntityTable::exists`] immediately, and the next
//! allocation of that slot receives a fresh stamp. [`EntityTable::clear`]
//! keeps the stamp counters, so references taken before a reset stay stale
//! afterwards too.
//!
//! # Iteration order
//!
//! [`EntityTable::ids`] walks slots in ascending order. The tick driver
//! relies on this for deterministic processing.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use skirmish_core::entity::Entity;
//! use skirmish_core::table::EntityTable;
//!
//! let mut table = EntityTable::with_capacity(8);
//! let first = table.allocate(Entity::circle(Vec2::ZERO, 5.0)).unwrap();
//! assert!(table.exists(first));
//!
//! table.release(first.id()).unwrap();
//! assert!(!table.exists(first));
//!
//! // The slot is reused with a new generation.
//! let second = table.allocate(Entity::circle(Vec2::ZERO, 5.0)).unwrap();
//! assert_eq!(second.id(), first.id());
//! assert!(!table.exists(first));
//! ```

use glam::Vec2;
use sieve::{Occupancy, MAX_ENTITY_COUNT};

use crate::entity::{Entity, EntityId, EntityRef, PhysicsFlags, PositionFlags};
use crate::TableError;

/// World-space placement of an entity, children included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    /// World coordinates
    pub coords: Vec2,
    /// World facing in radians
    pub angle: f32,
}

/// Bounded arena of entities indexed by [`EntityId`].
#[derive(Debug, Clone)]
pub struct EntityTable {
    slots: Vec<Option<Entity>>,
    stamps: Vec<u8>,
    global: Vec<EntityId>,
    lowest_free: usize,
    next_z_index: u32,
    len: usize,
}

impl Default for EntityTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityTable {
    /// Table with [`MAX_ENTITY_COUNT`] slots.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITY_COUNT)
    }

    /// Table with `capacity` slots, capped at [`MAX_ENTITY_COUNT`].
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_ENTITY_COUNT);
        Self {
            slots: vec![None; capacity],
            stamps: vec![0; capacity],
            global: Vec::new(),
            lowest_free: 0,
            next_z_index: 0,
            len: 0,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stores `entity` in the lowest free slot.
    ///
    /// The entity is stamped with its new [`EntityRef`] and the next z-index.
    /// If it already names a parent, it is attached through
    /// [`set_parent`](Self::set_parent); a stale parent is dropped. Entities
    /// flagged [`PhysicsFlags::SHOWS_ON_MAP`] join the global index.
    ///
    /// # Errors
    ///
    /// [`TableError::OutOfIdentifiers`] when every slot is taken.
    pub fn allocate(&mut self, mut entity: Entity) -> Result<EntityRef, TableError> {
        let Some(index) = self.slots[self.lowest_free..]
            .iter()
            .position(Option::is_none)
            .map(|offset| self.lowest_free + offset)
        else {
            tracing::warn!(capacity = self.capacity(), "entity table out of identifiers");
            return Err(TableError::OutOfIdentifiers {
                capacity: self.capacity(),
            });
        };

        let stamp = match self.stamps[index].wrapping_add(1) {
            0 => 1,
            next => next,
        };
        self.stamps[index] = stamp;

        let id = EntityId::new(u16::try_from(index).map_err(|_| TableError::OutOfIdentifiers {
            capacity: self.capacity(),
        })?);
        let handle = EntityRef::new(id, stamp);

        let parent = entity.relations.parent.take();
        entity.stamp(handle);
        entity.style.z_index = self.next_z_index;
        self.next_z_index = self.next_z_index.wrapping_add(1);
        entity.hierarchy.is_physical = true;
        entity.hierarchy.is_child = false;
        entity.hierarchy.root = None;
        entity.hierarchy.children.clear();
        let shows_on_map = entity.physics.flags.contains(PhysicsFlags::SHOWS_ON_MAP);

        self.slots[index] = Some(entity);
        self.len += 1;
        self.lowest_free = index + 1;

        if shows_on_map {
            self.global.push(id);
        }
        if let Some(parent) = parent {
            if self.set_parent(id, parent).is_err() {
                tracing::debug!(%id, ?parent, "dropping stale parent on allocation");
            }
        }

        Ok(handle)
    }

    /// Empties slot `id`.
    ///
    /// Children are detached from their root; roots release all their
    /// children with them. The slot leaves the global index.
    ///
    /// # Errors
    ///
    /// [`TableError::NotPresent`] if the slot is already empty. That is a
    /// caller defect, not a stale-reference condition.
    pub fn release(&mut self, id: EntityId) -> Result<(), TableError> {
        let entity = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(TableError::NotPresent { id })?;

        self.len -= 1;
        self.lowest_free = self.lowest_free.min(id.index());

        if entity.physics.flags.contains(PhysicsFlags::SHOWS_ON_MAP) {
            if let Some(pos) = self.global.iter().position(|&g| g == id) {
                self.global.swap_remove(pos);
            }
        }

        if entity.hierarchy.is_child {
            if let Some(root) = entity.hierarchy.root.and_then(|r| self.get_mut(r)) {
                if let Some(pos) = root.hierarchy.children.iter().position(|&c| c == id) {
                    root.hierarchy.children.swap_remove(pos);
                }
            }
        } else {
            for child in entity.hierarchy.children {
                if let Some(child_entity) = self.get_mut(child) {
                    child_entity.hierarchy.is_child = false;
                    self.release(child)?;
                }
            }
        }

        tracing::debug!(%id, "entity released");
        Ok(())
    }

    /// Returns true if `entity` still refers to the entity it was taken from.
    #[must_use]
    pub fn exists(&self, entity: EntityRef) -> bool {
        self.resolve(entity).is_some()
    }

    /// Releases every slot. Generation stamps are kept.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.global.clear();
        self.lowest_free = 0;
        self.len = 0;
        tracing::debug!("entity table cleared");
    }

    /// Removes `id` immediately, or starts its deletion animation.
    ///
    /// With `animate` the entity stays in the table until the animation
    /// finishes; living entities drop to zero health right away.
    ///
    /// # Errors
    ///
    /// [`TableError::NotPresent`] if the slot is empty.
    pub fn destroy(&mut self, id: EntityId, animate: bool) -> Result<(), TableError> {
        if animate {
            self.get_mut(id)
                .ok_or(TableError::NotPresent { id })?
                .begin_deletion();
            Ok(())
        } else {
            self.release(id)
        }
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// Entity in slot `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable entity in slot `id`.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Entity behind `entity`, if the reference is still current.
    #[must_use]
    pub fn resolve(&self, entity: EntityRef) -> Option<&Entity> {
        self.get(entity.id())
            .filter(|e| e.entity_ref() == Some(entity))
    }

    /// Mutable entity behind `entity`, if the reference is still current.
    pub fn resolve_mut(&mut self, entity: EntityRef) -> Option<&mut Entity> {
        self.get_mut(entity.id())
            .filter(|e| e.entity_ref() == Some(entity))
    }

    /// Live generation of slot `id`; 0 when empty.
    #[must_use]
    pub fn generation(&self, id: EntityId) -> u8 {
        self.get(id)
            .and_then(Entity::entity_ref)
            .map_or(0, EntityRef::generation)
    }

    /// Live ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .and_then(|_| u16::try_from(index).ok())
                .map(EntityId::new)
        })
    }

    /// Live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    // =========================================================================
    // Hierarchy and indices
    // =========================================================================

    /// Attaches `child` under `parent`.
    ///
    /// The child leaves the children list of its previous root and joins the
    /// list of the parent's root, then stops being physical. Children the
    /// entity carried as a root move with it to the new root.
    ///
    /// # Errors
    ///
    /// [`TableError::NotPresent`] if either side is gone,
    /// [`TableError::CyclicParent`] if `parent` is `child` or one of its
    /// descendants.
    pub fn set_parent(&mut self, child: EntityId, parent: EntityRef) -> Result<(), TableError> {
        let parent_entity = self
            .resolve(parent)
            .ok_or(TableError::NotPresent { id: parent.id() })?;
        let root = parent_entity.hierarchy.root.unwrap_or(parent.id());
        if root == child || parent.id() == child {
            return Err(TableError::CyclicParent { id: child });
        }

        let child_entity = self
            .get_mut(child)
            .ok_or(TableError::NotPresent { id: child })?;
        let previous_root = if child_entity.hierarchy.is_child {
            child_entity.hierarchy.root
        } else {
            None
        };
        let carried = std::mem::take(&mut child_entity.hierarchy.children);
        child_entity.relations.parent = Some(parent);
        child_entity.hierarchy.root = Some(root);
        child_entity.hierarchy.is_child = true;
        child_entity.hierarchy.is_physical = false;

        if let Some(old) = previous_root.and_then(|r| self.get_mut(r)) {
            old.hierarchy.children.retain(|&c| c != child);
        }
        for &id in &carried {
            if let Some(descendant) = self.get_mut(id) {
                descendant.hierarchy.root = Some(root);
            }
        }
        if let Some(root_entity) = self.get_mut(root) {
            root_entity.hierarchy.children.push(child);
            root_entity.hierarchy.children.extend(carried);
        }
        Ok(())
    }

    /// World placement of `id`, composing every live ancestor.
    ///
    /// Ancestor offsets are summed; the local offset is rotated by the angles
    /// of ancestors flagged [`PositionFlags::ABSOLUTE_ROTATION`], and the
    /// facing accumulates the angles of the others.
    #[must_use]
    pub fn world_position(&self, id: EntityId) -> Option<WorldTransform> {
        let entity = self.get(id)?;
        let local = entity.position.coords;
        let mut offset = Vec2::ZERO;
        let mut rotation = 0.0f32;
        let mut angle = entity.position.angle;

        let mut current = entity;
        // Bounded walk: a corrupted chain cannot loop forever.
        for _ in 0..self.capacity() {
            let Some(parent) = current.relations.parent.and_then(|p| self.resolve(p)) else {
                break;
            };
            if parent.position.flags.contains(PositionFlags::ABSOLUTE_ROTATION) {
                rotation += parent.position.angle;
            } else {
                angle += parent.position.angle;
            }
            offset += parent.position.coords;
            current = parent;
        }

        Some(WorldTransform {
            coords: offset + Vec2::from_angle(rotation).rotate(local),
            angle,
        })
    }

    /// Flags `id` as map-visible and adds it to the global index.
    ///
    /// # Errors
    ///
    /// [`TableError::NotPresent`] if the slot is empty.
    pub fn set_global(&mut self, id: EntityId) -> Result<(), TableError> {
        let entity = self.get_mut(id).ok_or(TableError::NotPresent { id })?;
        entity.physics.flags |= PhysicsFlags::SHOWS_ON_MAP;
        if !self.global.contains(&id) {
            self.global.push(id);
        }
        Ok(())
    }

    /// Ids of map-visible entities.
    #[must_use]
    pub fn global_entities(&self) -> &[EntityId] {
        &self.global
    }
}

impl Occupancy for EntityTable {
    fn is_live(&self, id: u16) -> bool {
        self.get(EntityId::new(id)).is_some()
    }
}
