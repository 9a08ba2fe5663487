//! Factories for test worlds and entities.
//!
//! Worlds are kept small: the pair bitset grows with the square of the
//! capacity.

use glam::Vec2;

use crate::config::SimulationConfig;
use crate::entity::{Entity, EntityRef, Health, TeamId};
use crate::simulation::Simulation;

/// Slots in every test world.
pub const TEST_CAPACITY: usize = 256;

// =============================================================================
// Worlds
// =============================================================================

/// Empty world with [`TEST_CAPACITY`] slots.
pub fn test_sim(seed: u64) -> Simulation {
    Simulation::new(
        SimulationConfig::default()
            .with_seed(seed)
            .with_capacity(TEST_CAPACITY),
    )
    .unwrap()
}

/// Runs `ticks` steps with no consumers.
pub fn run_ticks(sim: &mut Simulation, ticks: usize) {
    for _ in 0..ticks {
        sim.step().unwrap();
    }
}

// =============================================================================
// Entities
// =============================================================================

/// Non-living circle.
pub fn spawn_circle(sim: &mut Simulation, coords: Vec2, radius: f32) -> EntityRef {
    sim.table_mut()
        .allocate(Entity::circle(coords, radius))
        .unwrap()
}

/// Living circle of radius 10 on `team`.
pub fn spawn_fighter(sim: &mut Simulation, coords: Vec2, team: u16, health: f32) -> EntityRef {
    sim.table_mut()
        .allocate(
            Entity::circle(coords, 10.0)
                .with_team(TeamId::new(team))
                .with_health(Health::new(health)),
        )
        .unwrap()
}

/// Allocates an arbitrary entity.
pub fn spawn(sim: &mut Simulation, entity: Entity) -> EntityRef {
    sim.table_mut().allocate(entity).unwrap()
}

// =============================================================================
// Inspection
// =============================================================================

/// Current health, if the entity is alive and living.
pub fn health_of(sim: &Simulation, entity: EntityRef) -> Option<f32> {
    sim.table()
        .resolve(entity)
        .and_then(|e| e.health.as_ref())
        .map(|h| h.health)
}

/// Current coordinates, if the entity is alive.
pub fn position_of(sim: &Simulation, entity: EntityRef) -> Option<Vec2> {
    sim.table().resolve(entity).map(|e| e.position.coords)
}

/// Current velocity, if the entity is alive.
pub fn velocity_of(sim: &Simulation, entity: EntityRef) -> Option<Vec2> {
    sim.table().resolve(entity).map(|e| e.velocity)
}
