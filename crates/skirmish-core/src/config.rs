//! Simulation configuration.
//!
//! Every tunable constant of the tick loop lives here so a world can be
//! described as data (for example loaded from JSON by the server shell).
//! Defaults reproduce the standard arena: 22300 x 22300 units, 200 units of
//! boundary padding, 16384 entity slots and 256-unit grid cells.
//!
//! ```
//! use skirmish_core::SimulationConfig;
//!
//! let config = SimulationConfig::default()
//!     .with_seed(42)
//!     .with_arena(4000.0, 3000.0);
//! assert!(config.validate().is_ok());
//! assert_eq!(config.bounds().width(), 4000.0);
//! ```

use serde::{Deserialize, Serialize};
use sieve::{Bounds, GridConfig, MAX_ENTITY_COUNT};

use crate::ConfigError;

/// Arena dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Arena width, centered on the origin
    pub width: f32,
    /// Arena height, centered on the origin
    pub height: f32,
    /// Band outside the arena entities may drift into before being clamped
    pub padding: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 22300.0,
            height: 22300.0,
            padding: 200.0,
        }
    }
}

/// Motion constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Fraction of velocity removed every tick
    pub friction: f32,
    /// Speeds below this snap to zero
    pub rest_threshold: f32,
    /// Velocity multiplier on wall/base contact; knockback is divided by it
    pub wall_damping: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            friction: 0.1,
            rest_threshold: 0.01,
            wall_damping: 0.3,
        }
    }
}

/// Living-entity upkeep constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Ticks without damage before boosted regeneration starts
    pub regen_boost_delay_ticks: u64,
    /// Boosted regeneration adds `max_health / regen_boost_divisor` per tick
    pub regen_boost_divisor: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            regen_boost_delay_ticks: 750,
            regen_boost_divisor: 250.0,
        }
    }
}

/// Configuration for a [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the deterministic RNG
    pub seed: u64,
    /// Entity slots (at most [`MAX_ENTITY_COUNT`])
    pub capacity: usize,
    /// Grid cells are `1 << cell_shift` units square
    pub cell_shift: u32,
    /// Arena dimensions
    pub arena: ArenaConfig,
    /// Motion constants
    pub physics: PhysicsConfig,
    /// Living-entity upkeep constants
    pub health: HealthConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            capacity: MAX_ENTITY_COUNT,
            cell_shift: sieve::grid::DEFAULT_CELL_SHIFT,
            arena: ArenaConfig::default(),
            physics: PhysicsConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of entity slots.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the arena dimensions, keeping the padding.
    #[must_use]
    pub fn with_arena(mut self, width: f32, height: f32) -> Self {
        self.arena.width = width;
        self.arena.height = height;
        self
    }

    /// Sets the grid cell size exponent.
    #[must_use]
    pub fn with_cell_shift(mut self, cell_shift: u32) -> Self {
        self.cell_shift = cell_shift;
        self
    }

    /// Initial world bounds.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.arena.width, self.arena.height)
    }

    /// Grid sizing derived from capacity and cell shift.
    #[must_use]
    pub fn grid_config(&self) -> GridConfig {
        GridConfig::for_capacity(self.capacity).with_cell_shift(self.cell_shift)
    }

    /// Checks every field.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_ENTITY_COUNT {
            return Err(ConfigError::Capacity {
                capacity: self.capacity,
                max: MAX_ENTITY_COUNT,
            });
        }
        if !(1..=16).contains(&self.cell_shift) {
            return Err(ConfigError::CellShift(self.cell_shift));
        }
        let ArenaConfig {
            width,
            height,
            padding,
        } = self.arena;
        if !(width > 0.0 && height > 0.0) {
            return Err(ConfigError::ArenaSize { width, height });
        }

        check_range("arena.padding", padding, 0.0, f32::MAX, "0 or more")?;
        check_range("physics.friction", self.physics.friction, 0.0, 1.0, "0..=1")?;
        check_range(
            "physics.rest_threshold",
            self.physics.rest_threshold,
            0.0,
            f32::MAX,
            "0 or more",
        )?;
        // Zero damping would divide knockback by zero.
        if !(self.physics.wall_damping > 0.0 && self.physics.wall_damping <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "physics.wall_damping",
                value: self.physics.wall_damping,
                expected: "greater than 0, at most 1",
            });
        }
        if !(self.health.regen_boost_divisor > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "health.regen_boost_divisor",
                value: self.health.regen_boost_divisor,
                expected: "greater than 0",
            });
        }
        Ok(())
    }
}

fn check_range(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
    expected: &'static str,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity, 16384);
        assert_eq!(config.grid_config().cell_size(), 256.0);
        assert_eq!(config.bounds().width(), 22300.0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = SimulationConfig::default().with_capacity(0);
        assert!(matches!(config.validate(), Err(ConfigError::Capacity { .. })));
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let config = SimulationConfig::default().with_capacity(MAX_ENTITY_COUNT + 1);
        assert!(matches!(config.validate(), Err(ConfigError::Capacity { .. })));
    }

    #[test]
    fn degenerate_arena_is_rejected() {
        let config = SimulationConfig::default().with_arena(0.0, 100.0);
        assert!(matches!(config.validate(), Err(ConfigError::ArenaSize { .. })));
    }

    #[test]
    fn zero_wall_damping_is_rejected() {
        let mut config = SimulationConfig::default();
        config.physics.wall_damping = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                name: "physics.wall_damping",
                ..
            })
        ));
    }

    #[test]
    fn friction_above_one_is_rejected() {
        let mut config = SimulationConfig::default();
        config.physics.friction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_cell_shift_is_rejected() {
        let config = SimulationConfig::default().with_cell_shift(0);
        assert_eq!(config.validate(), Err(ConfigError::CellShift(0)));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SimulationConfig::default().with_seed(99).with_arena(500.0, 400.0);
        let json = serde_json::to_string(&config).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn small_capacity_shrinks_grid_ids() {
        let config = SimulationConfig::default().with_capacity(100);
        assert_eq!(config.grid_config().capacity(), 128);
    }
}
