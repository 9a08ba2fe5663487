//! Tick driver running the phases of one simulation step in a fixed order.
//!
//! # Phases
//!
//! 1. **BROAD PHASE**: open the grid for the tick and insert every physical
//!    root entity by its bounding box
//! 2. **COLLISION**: enumerate unique candidate pairs; pairs that pass the
//!    narrow phase go through each registered resolver in order
//! 3. **INTEGRATE**: apply motion, friction and health upkeep to every
//!    physical entity
//! 4. **ENTITY TICK**: advance deletion animations (removing finished ones),
//!    visit children, confine roots to the arena
//! 5. **CONSUMERS**: external logic queries the still-open grid through a
//!    [`TickScope`]
//! 6. **CLOSE**: lock the grid
//!
//! # Determinism
//!
//! Given the same seed and the same sequence of inputs, two simulations
//! produce identical states:
//! - Entities are visited in ascending id order
//! - Pairs arrive in the grid's fixed cell order
//! - The only randomness is the world's seeded [`ChaCha8Rng`]
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use skirmish_core::entity::Entity;
//! use skirmish_core::{Simulation, SimulationConfig, ViewRange};
//!
//! let config = SimulationConfig::default().with_capacity(64);
//! let mut sim = Simulation::new(config).unwrap();
//! sim.table_mut().allocate(Entity::circle(Vec2::ZERO, 10.0)).unwrap();
//!
//! let mut seen = 0;
//! sim.step_with(|scope| {
//!     seen = scope.candidates(Vec2::ZERO, ViewRange::Bounded(50.0))?.len();
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(sim.tick(), 1);
//! assert_eq!(seen, 1);
//! ```

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sieve::{Bounds, HashGrid};

use crate::animation::AnimationStep;
use crate::config::SimulationConfig;
use crate::entity::EntityId;
use crate::event::{EventLog, TickEvent};
use crate::query::TickScope;
use crate::resolver::{
    contact, Contact, DamageResolver, KnockbackResolver, PhysicsResolver, Resolver, TickContext,
};
use crate::table::EntityTable;
use crate::SimError;

// =============================================================================
// Simulation
// =============================================================================

/// One simulated world.
///
/// Owns the entity table, the broad-phase grid, the seeded RNG and the
/// resolver pipeline. Several worlds can live in one process; nothing is
/// shared between them.
pub struct Simulation {
    config: SimulationConfig,
    table: EntityTable,
    grid: HashGrid,
    rng: ChaCha8Rng,
    resolvers: Vec<Box<dyn Resolver>>,
    physics: PhysicsResolver,
    events: EventLog,
    bounds: Bounds,
    tick: u64,
    /// Reused id buffer for the per-entity phases.
    scratch: Vec<EntityId>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("seed", &self.config.seed)
            .field("entities", &self.table.len())
            .field("bounds", &self.bounds)
            .field(
                "resolvers",
                &self.resolvers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("pending_events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates an empty world at tick 0.
    ///
    /// The default pipeline is knockback followed by damage.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] if `config` fails validation.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;

        let grid = HashGrid::new(config.grid_config());
        let table = EntityTable::with_capacity(config.capacity);
        let resolvers: Vec<Box<dyn Resolver>> = vec![
            Box::new(KnockbackResolver::new(&config.physics)),
            Box::new(DamageResolver::new()),
        ];

        tracing::debug!(
            seed = config.seed,
            capacity = config.capacity,
            cell_shift = config.cell_shift,
            "simulation created"
        );

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            physics: PhysicsResolver::new(&config),
            bounds: config.bounds(),
            grid,
            table,
            resolvers,
            events: EventLog::new(),
            tick: 0,
            scratch: Vec::new(),
            config,
        })
    }

    /// Appends a resolver to the collision pipeline.
    ///
    /// Resolvers run in registration order for every confirmed contact.
    pub fn push_resolver(&mut self, resolver: Box<dyn Resolver>) {
        self.resolvers.push(resolver);
    }

    /// Number of resolvers in the collision pipeline.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }

    /// Advances the world by one tick with no external consumers.
    ///
    /// # Errors
    ///
    /// See [`step_with`](Self::step_with).
    pub fn step(&mut self) -> Result<(), SimError> {
        self.step_with(|_| Ok(()))
    }

    /// Advances the world by one tick, running `consumer` while the grid is
    /// still open.
    ///
    /// # Errors
    ///
    /// Any error from the phases or from `consumer`. A [`SimError::Grid`]
    /// means the tick was abandoned part-way through.
    pub fn step_with<F>(&mut self, consumer: F) -> Result<(), SimError>
    where
        F: FnOnce(&mut TickScope<'_>) -> Result<(), SimError>,
    {
        self.tick += 1;
        let tick = self.tick;
        self.grid.begin_tick(tick, self.bounds);

        let result = self.run_phases(tick, consumer);

        self.grid.end_tick(tick);
        if let Err(err) = &result {
            tracing::error!(tick, error = %err, "tick abandoned");
        } else {
            tracing::trace!(tick, entities = self.table.len(), "tick complete");
        }
        result
    }

    fn run_phases<F>(&mut self, tick: u64, consumer: F) -> Result<(), SimError>
    where
        F: FnOnce(&mut TickScope<'_>) -> Result<(), SimError>,
    {
        self.populate_grid()?;
        self.resolve_contacts(tick)?;
        self.integrate(tick);
        self.tick_entities(tick)?;

        let mut scope = TickScope::new(tick, &mut self.grid, &mut self.table);
        consumer(&mut scope)
    }

    // =========================================================================
    // Phases
    // =========================================================================

    fn populate_grid(&mut self) -> Result<(), SimError> {
        for entity in self.table.iter() {
            if !entity.hierarchy.is_physical || entity.hierarchy.is_child {
                continue;
            }
            if let Some(handle) = entity.entity_ref() {
                self.grid.insert(handle.id().as_u16(), entity.aabb())?;
            }
        }
        Ok(())
    }

    fn resolve_contacts(&mut self, tick: u64) -> Result<(), SimError> {
        let resolvers = &self.resolvers;
        let mut ctx = TickContext {
            tick,
            table: &mut self.table,
            rng: &mut self.rng,
            events: &mut self.events,
        };

        let mut contacts = 0usize;
        let pairs = self.grid.for_each_collision_pair(&mut ctx, |ctx, a, b| {
            let (a, b) = (EntityId::new(a), EntityId::new(b));
            if !contact::is_colliding(ctx.table, a, b) {
                return;
            }
            contacts += 1;
            for resolver in resolvers {
                resolver.resolve(Contact { a, b }, ctx);
            }
        })?;

        tracing::trace!(tick, pairs, contacts, "contacts resolved");
        Ok(())
    }

    fn integrate(&mut self, tick: u64) {
        self.scratch.clear();
        self.scratch.extend(self.table.ids());
        for &id in &self.scratch {
            if let Some(entity) = self.table.get_mut(id) {
                if entity.hierarchy.is_physical {
                    self.physics.integrate(entity, tick);
                }
            }
        }
    }

    fn tick_entities(&mut self, tick: u64) -> Result<(), SimError> {
        self.scratch.clear();
        self.scratch.extend(self.table.ids());
        let ids = std::mem::take(&mut self.scratch);

        let mut result = Ok(());
        for &id in &ids {
            let is_root = self.table.get(id).is_some_and(|e| !e.hierarchy.is_child);
            if is_root {
                result = self.tick_entity(id, tick);
                if result.is_err() {
                    break;
                }
            }
        }

        self.scratch = ids;
        result
    }

    /// Advances one entity and, for roots, every child.
    ///
    /// Slots emptied earlier in the phase are skipped.
    fn tick_entity(&mut self, id: EntityId, tick: u64) -> Result<(), SimError> {
        let Some(entity) = self.table.get_mut(id) else {
            return Ok(());
        };

        if let Some(animation) = entity.deletion.as_mut() {
            if animation.advance(&mut entity.physics, &mut entity.style) == AnimationStep::Remove {
                let handle = entity.entity_ref();
                self.table.release(id)?;
                if let Some(handle) = handle {
                    self.events.push(TickEvent::Removed {
                        tick,
                        entity: handle,
                    });
                }
                return Ok(());
            }
        }

        self.physics.confine(entity, &self.bounds);
        if entity.hierarchy.is_child || entity.hierarchy.children.is_empty() {
            return Ok(());
        }

        let children = entity.hierarchy.children.clone();
        for child in children {
            self.tick_entity(child, tick)?;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Replaces the arena bounds used from the next tick on.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// Current arena bounds.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Ticks completed so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Seed the world's RNG was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.config.seed
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The world's entities.
    #[must_use]
    pub fn table(&self) -> &EntityTable {
        &self.table
    }

    /// Mutable access to the world's entities between ticks.
    pub fn table_mut(&mut self) -> &mut EntityTable {
        &mut self.table
    }

    /// Events recorded since the last drain.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Takes every recorded event.
    pub fn drain_events(&mut self) -> Vec<TickEvent> {
        self.events.drain()
    }
}

// =============================================================================
// Tests
// =============================================================================
