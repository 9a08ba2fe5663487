//! Physics integrator: motion, friction, arena confinement, health upkeep.
//!
//! # Per-tick motion
//!
//! 1. speeds below the rest threshold snap to zero; otherwise an entity that
//!    is being deleted loses half its velocity
//! 2. `position += velocity`
//! 3. friction removes a fixed fraction of the velocity
//!
//! There is no time step: velocities are in units per tick, which keeps the
//! integration exact across platforms for a given sequence of inputs.
//!
//! # Living entities
//!
//! After motion, a living entity whose health is gone starts its deletion
//! animation. Otherwise it regenerates, with a boost once it has gone long
//! enough without taking damage, and its per-tick exchange record is cleared.

use glam::Vec2;
use sieve::Bounds;

use crate::config::{HealthConfig, SimulationConfig};
use crate::entity::{Entity, PhysicsFlags};

/// Integrator for physical entities.
///
/// # Example
///
/// ```
/// use glam::Vec2;
/// use skirmish_core::entity::Entity;
/// use skirmish_core::resolver::PhysicsResolver;
///
/// let physics = PhysicsResolver::default();
/// let mut ball = Entity::circle(Vec2::ZERO, 5.0).with_velocity(Vec2::new(10.0, 0.0));
/// physics.integrate(&mut ball, 1);
///
/// assert_eq!(ball.position.coords, Vec2::new(10.0, 0.0));
/// assert_eq!(ball.velocity, Vec2::new(9.0, 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct PhysicsResolver {
    friction: f32,
    rest_threshold: f32,
    padding: f32,
    health: HealthConfig,
}

impl Default for PhysicsResolver {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

impl PhysicsResolver {
    /// Creates an integrator from the world configuration.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            friction: config.physics.friction,
            rest_threshold: config.physics.rest_threshold,
            padding: config.arena.padding,
            health: config.health,
        }
    }

    /// Advances one entity by a tick.
    pub fn integrate(&self, entity: &mut Entity, tick: u64) {
        if entity.velocity.length() < self.rest_threshold {
            entity.velocity = Vec2::ZERO;
        } else if entity.is_deleting() {
            entity.velocity /= 2.0;
        }

        entity.position.coords += entity.velocity;
        entity.velocity -= entity.velocity * self.friction;

        if entity.is_living() {
            self.upkeep(entity, tick);
        }
    }

    /// Keeps an entity inside `bounds` grown by the arena padding.
    ///
    /// Entities that can escape the arena, and non-physical ones, are left
    /// alone.
    pub fn confine(&self, entity: &mut Entity, bounds: &Bounds) {
        if !entity.hierarchy.is_physical
            || entity.physics.flags.contains(PhysicsFlags::CAN_ESCAPE_ARENA)
        {
            return;
        }
        entity.position.coords = bounds.expanded(self.padding).clamp(entity.position.coords);
    }

    fn upkeep(&self, entity: &mut Entity, tick: u64) {
        let Some(health) = entity.health.as_mut() else {
            return;
        };
        health.exchanged_with.clear();

        if health.health <= 0.0 {
            entity.begin_deletion();
            return;
        }

        if health.health < health.max_health {
            health.health += health.regen_per_tick;
            if tick.saturating_sub(health.last_damage_tick) >= self.health.regen_boost_delay_ticks {
                health.health += health.max_health / self.health.regen_boost_divisor;
            }
        }
        health.health = health.health.min(health.max_health);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, Health};

    mod motion_tests {
        use super::*;

        #[test]
        fn friction_removes_a_tenth() {
            let physics = PhysicsResolver::default();
            let mut entity = Entity::circle(Vec2::ZERO, 5.0).with_velocity(Vec2::new(0.0, -20.0));
            physics.integrate(&mut entity, 1);
            assert_eq!(entity.position.coords, Vec2::new(0.0, -20.0));
            assert_eq!(entity.velocity, Vec2::new(0.0, -18.0));
        }

        #[test]
        fn slow_entities_come_to_rest() {
            let physics = PhysicsResolver::default();
            let mut entity = Entity::circle(Vec2::ONE, 5.0).with_velocity(Vec2::new(0.005, 0.0));
            physics.integrate(&mut entity, 1);
            assert_eq!(entity.velocity, Vec2::ZERO);
            assert_eq!(entity.position.coords, Vec2::ONE);
        }

        #[test]
        fn deleting_entities_slow_down() {
            let physics = PhysicsResolver::default();
            let mut entity = Entity::circle(Vec2::ZERO, 5.0).with_velocity(Vec2::new(10.0, 0.0));
            entity.begin_deletion();
            physics.integrate(&mut entity, 1);
            assert_eq!(entity.position.coords, Vec2::new(5.0, 0.0));
            assert_eq!(entity.velocity, Vec2::new(4.5, 0.0));
        }

        #[test]
        fn velocity_decays_geometrically() {
            let physics = PhysicsResolver::default();
            let mut entity = Entity::circle(Vec2::ZERO, 5.0).with_velocity(Vec2::new(10.0, 0.0));
            for tick in 1..=200 {
                physics.integrate(&mut entity, tick);
            }
            assert_eq!(entity.velocity, Vec2::ZERO);
            // Travel is bounded by v / friction.
            assert!(entity.position.coords.x <= 100.0);
        }
    }

    mod confine_tests {
        use super::*;

        #[test]
        fn clamps_into_padded_bounds() {
            let physics = PhysicsResolver::default();
            let bounds = Bounds::new(1000.0, 1000.0);
            let mut entity = Entity::circle(Vec2::new(900.0, -450.0), 5.0);
            physics.confine(&mut entity, &bounds);
            assert_eq!(entity.position.coords, Vec2::new(700.0, -450.0));
        }

        #[test]
        fn escapees_are_not_clamped() {
            let physics = PhysicsResolver::default();
            let bounds = Bounds::new(1000.0, 1000.0);
            let mut entity = Entity::circle(Vec2::new(900.0, 0.0), 5.0)
                .with_physics_flags(PhysicsFlags::CAN_ESCAPE_ARENA);
            physics.confine(&mut entity, &bounds);
            assert_eq!(entity.position.coords.x, 900.0);
        }
    }

    mod upkeep_tests {
        use super::*;

        #[test]
        fn regen_is_capped() {
            let physics = PhysicsResolver::default();
            let mut entity = Entity::circle(Vec2::ZERO, 5.0).with_health(Health::new(10.0).with_regen(3.0));
            entity.health.as_mut().unwrap().health = 9.0;
            physics.integrate(&mut entity, 1);
            assert_eq!(entity.health.as_ref().unwrap().health, 10.0);
        }

        #[test]
        fn boost_after_quiet_period() {
            let physics = PhysicsResolver::default();
            let mut entity =
                Entity::circle(Vec2::ZERO, 5.0).with_health(Health::new(500.0).with_regen(0.5));
            {
                let health = entity.health.as_mut().unwrap();
                health.health = 100.0;
                health.last_damage_tick = 1000;
            }

            physics.integrate(&mut entity, 1749);
            assert!((entity.health.as_ref().unwrap().health - 100.5).abs() < 1e-4);

            physics.integrate(&mut entity, 1750);
            // 0.5 regen + 500 / 250 boost
            assert!((entity.health.as_ref().unwrap().health - 103.0).abs() < 1e-4);
        }

        #[test]
        fn depleted_entities_start_deleting() {
            let physics = PhysicsResolver::default();
            let mut entity = Entity::circle(Vec2::ZERO, 5.0).with_health(Health::new(10.0).with_regen(5.0));
            entity.health.as_mut().unwrap().health = 0.0;
            physics.integrate(&mut entity, 1);
            assert!(entity.is_deleting());
            assert_eq!(entity.health.as_ref().unwrap().health, 0.0);
        }

        #[test]
        fn exchange_record_is_cleared() {
            let physics = PhysicsResolver::default();
            let mut entity = Entity::circle(Vec2::ZERO, 5.0).with_health(Health::new(10.0));
            entity
                .health
                .as_mut()
                .unwrap()
                .exchanged_with
                .push(EntityId::new(4));
            physics.integrate(&mut entity, 1);
            assert!(entity.health.as_ref().unwrap().exchanged_with.is_empty());
        }
    }
}
