//! # Sieve
//!
//! Broad-phase spatial substrate for arena simulations.
//!
//! Sieve partitions the arena into square cells that are rebuilt every tick.
//! Entities are identified by small dense integer ids (`0..capacity`), which
//! lets every bookkeeping structure be a flat array or bitset:
//!
//! - **[`HashGrid`]**: per-tick cell buckets, unique-pair enumeration, box queries
//! - **[`PackedIdSet`]**: fixed-capacity bitset used as a query result buffer
//!   and, pre-filled, as the "every id" sentinel
//!
//! ## Quick Start
//!
//! ```
//! use glam::Vec2;
//! use sieve::{Aabb, Bounds, GridConfig, HashGrid, PackedIdSet};
//!
//! let mut grid = HashGrid::new(GridConfig::for_capacity(64));
//! let mut live = PackedIdSet::with_capacity(64);
//! live.add(3);
//! live.add(7);
//!
//! grid.begin_tick(1, Bounds::new(1024.0, 1024.0));
//! grid.insert(3, Aabb::new(Vec2::new(0.0, 0.0), Vec2::splat(10.0))).unwrap();
//! grid.insert(7, Aabb::new(Vec2::new(5.0, 0.0), Vec2::splat(10.0))).unwrap();
//!
//! let mut pairs = Vec::new();
//! grid.for_each_collision_pair(&mut live, |_, a, b| pairs.push((a, b))).unwrap();
//! assert_eq!(pairs, vec![(3, 7)]);
//!
//! grid.end_tick(1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod grid;
pub mod packed;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use grid::{GridConfig, GridError, HashGrid};
pub use packed::PackedIdSet;

/// Largest number of simultaneously addressable ids.
pub const MAX_ENTITY_COUNT: usize = 1 << ENTITY_ID_BITS;

/// Bits needed to encode any id below [`MAX_ENTITY_COUNT`].
pub const ENTITY_ID_BITS: u32 = 14;

/// Source of truth for whether an id still refers to a live entity.
///
/// The grid only stores ids. Entities can be released between insertion and
/// enumeration, so every read path re-checks liveness through this trait.
pub trait Occupancy {
    /// Returns true if `id` currently refers to a live entity.
    fn is_live(&self, id: u16) -> bool;
}

impl Occupancy for PackedIdSet {
    fn is_live(&self, id: u16) -> bool {
        self.has(id)
    }
}

impl<T: Occupancy + ?Sized> Occupancy for &T {
    fn is_live(&self, id: u16) -> bool {
        (**self).is_live(id)
    }
}

impl<T: Occupancy + ?Sized> Occupancy for &mut T {
    fn is_live(&self, id: u16) -> bool {
        (**self).is_live(id)
    }
}

/// Axis-aligned rectangle describing the playable world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner (left, top)
    pub min: Vec2,
    /// Maximum corner (right, bottom)
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds from dimensions (centered at origin).
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(-width / 2.0, -height / 2.0),
            max: Vec2::new(width / 2.0, height / 2.0),
        }
    }

    /// Create bounds from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Width of the bounds.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Height of the bounds.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Check if a point is inside the bounds (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Bounds grown by `padding` on every side.
    #[must_use]
    pub fn expanded(&self, padding: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(padding),
            max: self.max + Vec2::splat(padding),
        }
    }

    /// Clamp a point into the bounds.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(22300.0, 22300.0)
    }
}

/// Axis-aligned bounding box given by center and half extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Box center
    pub center: Vec2,
    /// Half width (x) and half height (y)
    pub half_extents: Vec2,
}

impl Aabb {
    /// Create a box from its center and half extents.
    #[must_use]
    pub fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Square box of half side `half` around `center`.
    #[must_use]
    pub fn square(center: Vec2, half: f32) -> Self {
        Self::new(center, Vec2::splat(half))
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Vec2 {
        self.center - self.half_extents
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.center + self.half_extents
    }

    /// Check whether two boxes overlap (touching edges count).
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
    }
}
