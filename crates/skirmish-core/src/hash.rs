//! State hashing for determinism verification.
//!
//! Two worlds created with the same seed and fed the same inputs must hash
//! identically after every tick. Floats are hashed by their bit patterns.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::Vec2;

use crate::entity::Entity;
use crate::simulation::Simulation;
use crate::table::EntityTable;

/// Hash of a whole world: tick, seed and every entity.
#[must_use]
pub fn hash_world(sim: &Simulation) -> u64 {
    let mut hasher = DefaultHasher::new();
    sim.tick().hash(&mut hasher);
    sim.seed().hash(&mut hasher);
    hash_entities(sim.table(), &mut hasher);
    hasher.finish()
}

/// Hash of every live entity in ascending id order.
#[must_use]
pub fn hash_table(table: &EntityTable) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_entities(table, &mut hasher);
    hasher.finish()
}

fn hash_entities<H: Hasher>(table: &EntityTable, hasher: &mut H) {
    table.len().hash(hasher);
    for entity in table.iter() {
        hash_entity(entity, hasher);
    }
}

fn hash_entity<H: Hasher>(entity: &Entity, hasher: &mut H) {
    if let Some(handle) = entity.entity_ref() {
        handle.id().as_u16().hash(hasher);
        handle.generation().hash(hasher);
    }

    hash_vec2(entity.position.coords, hasher);
    entity.position.angle.to_bits().hash(hasher);
    hash_vec2(entity.velocity, hasher);
    entity.physics.size.to_bits().hash(hasher);
    entity.physics.width.to_bits().hash(hasher);
    entity.physics.sides.hash(hasher);
    entity.style.opacity.to_bits().hash(hasher);

    match &entity.health {
        Some(health) => {
            1u8.hash(hasher);
            health.health.to_bits().hash(hasher);
        }
        None => 0u8.hash(hasher),
    }
    entity.deletion.map(|d| d.frame()).hash(hasher);
}

fn hash_vec2<H: Hasher>(v: Vec2, hasher: &mut H) {
    v.x.to_bits().hash(hasher);
    v.y.to_bits().hash(hasher);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulationConfig;

    #[test]
    fn empty_worlds_match() {
        let a = Simulation::new(SimulationConfig::default().with_capacity(16)).unwrap();
        let b = Simulation::new(SimulationConfig::default().with_capacity(16)).unwrap();
        assert_eq!(hash_world(&a), hash_world(&b));
    }

    #[test]
    fn hash_sees_positions() {
        let mut a = EntityTable::with_capacity(4);
        let mut b = EntityTable::with_capacity(4);
        a.allocate(Entity::circle(Vec2::ZERO, 5.0)).unwrap();
        b.allocate(Entity::circle(Vec2::new(0.5, 0.0), 5.0)).unwrap();
        assert_ne!(hash_table(&a), hash_table(&b));
    }

    #[test]
    fn hash_sees_generations() {
        let mut a = EntityTable::with_capacity(4);
        let mut b = EntityTable::with_capacity(4);
        a.allocate(Entity::circle(Vec2::ZERO, 5.0)).unwrap();
        let first = b.allocate(Entity::circle(Vec2::ZERO, 5.0)).unwrap();
        b.release(first.id()).unwrap();
        b.allocate(Entity::circle(Vec2::ZERO, 5.0)).unwrap();
        assert_ne!(hash_table(&a), hash_table(&b));
    }
}
