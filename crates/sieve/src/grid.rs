//! Spatial hash grid rebuilt every tick.
//!
//! The grid only exists between [`HashGrid::begin_tick`] and
//! [`HashGrid::end_tick`]. Inside that window the driver inserts every
//! physical entity, enumerates candidate pairs, and lets other systems run box
//! queries. Outside the window the grid is locked and every access fails with
//! [`GridError::Locked`]; that error means a caller is running outside the
//! tick driver's control and the tick must be treated as corrupted.
//!
//! # Deduplication
//!
//! An entity whose box spans several cells is listed in each of them, so raw
//! cell walks see it repeatedly:
//!
//! - box queries stamp each visited id with a per-query id (`1..=0xFFFF`,
//!   wrapping to 1) instead of clearing a visited set per query
//! - pair enumeration marks `(low << id_bits) | high` in a capacity² bitset,
//!   so each unordered pair is delivered once per enumeration no matter how
//!   many cells the two entities share

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::packed::PackedIdSet;
use crate::{Aabb, Bounds, Occupancy, ENTITY_ID_BITS};

/// Default cell side is `1 << 8 = 256` world units.
pub const DEFAULT_CELL_SHIFT: u32 = 8;

/// Errors raised by grid access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    /// The grid was used outside the `begin_tick`/`end_tick` window.
    #[error("hash grid is locked: cannot {operation} outside of a tick")]
    Locked {
        /// The rejected operation
        operation: &'static str,
    },
    /// An id was inserted that the grid was not sized for.
    #[error("id {id} exceeds grid capacity {capacity}")]
    IdOutOfRange {
        /// The rejected id
        id: u16,
        /// Number of ids the grid addresses
        capacity: usize,
    },
}

/// Sizing parameters for a [`HashGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Cells are `1 << cell_shift` units square.
    pub cell_shift: u32,
    /// Ids are below `1 << id_bits`.
    pub id_bits: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_shift: DEFAULT_CELL_SHIFT,
            id_bits: ENTITY_ID_BITS,
        }
    }
}

impl GridConfig {
    /// Smallest config able to address ids `0..capacity`.
    #[must_use]
    pub fn for_capacity(capacity: usize) -> Self {
        let id_bits = capacity.max(2).next_power_of_two().trailing_zeros();
        Self {
            id_bits: id_bits.min(ENTITY_ID_BITS),
            ..Self::default()
        }
    }

    /// Override the cell size.
    #[must_use]
    pub fn with_cell_shift(mut self, cell_shift: u32) -> Self {
        self.cell_shift = cell_shift;
        self
    }

    /// Number of addressable ids.
    #[must_use]
    pub fn capacity(&self) -> usize {
        1 << self.id_bits
    }

    /// Side length of one cell in world units.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_size(&self) -> f32 {
        (1u32 << self.cell_shift) as f32
    }
}

/// Inclusive cell rectangle covered by a box.
#[derive(Debug, Clone, Copy)]
struct CellRange {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

/// Tick-scoped broad-phase index mapping cells to entity ids.
#[derive(Debug)]
pub struct HashGrid {
    config: GridConfig,
    locked: bool,
    tick: u64,
    origin: Vec2,
    cells_wide: usize,
    cells_high: usize,
    cells: Vec<Vec<u16>>,
    result: PackedIdSet,
    last_query: u16,
    query_stamps: Vec<u16>,
    /// capacity² bits, allocated on first pair enumeration.
    pairs_seen: Vec<u64>,
    touched_words: Vec<usize>,
}

impl HashGrid {
    /// Creates a locked, empty grid.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        let capacity = config.capacity();
        Self {
            config,
            locked: true,
            tick: 0,
            origin: Vec2::ZERO,
            cells_wide: 0,
            cells_high: 0,
            cells: Vec::new(),
            result: PackedIdSet::with_capacity(capacity),
            last_query: 0,
            query_stamps: vec![0; capacity],
            pairs_seen: Vec::new(),
            touched_words: Vec::new(),
        }
    }

    /// Returns the grid configuration.
    #[must_use]
    pub fn config(&self) -> GridConfig {
        self.config
    }

    /// Returns true outside the tick window.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Tick passed to the most recent `begin_tick`.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Grid dimensions in cells `(wide, high)` for the current tick.
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cells_wide, self.cells_high)
    }

    /// Opens the tick window, sizing cells from the current world bounds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn begin_tick(&mut self, tick: u64, bounds: Bounds) {
        let cell_size = self.config.cell_size();
        let cells_along = |extent: f32| (extent / cell_size).ceil().max(1.0) as usize;

        self.cells_wide = cells_along(bounds.width());
        self.cells_high = cells_along(bounds.height());
        self.origin = bounds.min;

        for cell in &mut self.cells {
            cell.clear();
        }
        self.cells
            .resize_with(self.cells_wide * self.cells_high, Vec::new);

        self.query_stamps.fill(0);
        self.last_query = 0;
        self.tick = tick;
        self.locked = false;

        tracing::trace!(
            tick,
            cells_wide = self.cells_wide,
            cells_high = self.cells_high,
            "hash grid opened"
        );
    }

    /// Closes the tick window and discards every bucket.
    pub fn end_tick(&mut self, tick: u64) {
        self.locked = true;
        self.cells.clear();
        tracing::trace!(tick, "hash grid locked");
    }

    /// Adds `id` to every cell its box overlaps.
    ///
    /// # Errors
    ///
    /// [`GridError::Locked`] outside the tick window,
    /// [`GridError::IdOutOfRange`] for ids the grid was not sized for.
    pub fn insert(&mut self, id: u16, aabb: Aabb) -> Result<(), GridError> {
        self.ensure_unlocked("insert")?;
        if usize::from(id) >= self.config.capacity() {
            return Err(GridError::IdOutOfRange {
                id,
                capacity: self.config.capacity(),
            });
        }

        let range = self.cell_range(&aabb);
        // Row-major walk keeps neighbouring buckets adjacent in memory.
        for y in range.y0..=range.y1 {
            let row = y * self.cells_wide;
            for x in range.x0..=range.x1 {
                self.cells[row + x].push(id);
            }
        }
        Ok(())
    }

    /// Collects the unique live ids listed in cells overlapping `query`.
    ///
    /// The returned set is a buffer owned by the grid and is overwritten by
    /// the next query.
    ///
    /// # Errors
    ///
    /// [`GridError::Locked`] outside the tick window.
    pub fn retrieve<C: Occupancy + ?Sized>(
        &mut self,
        live: &C,
        query: Aabb,
    ) -> Result<&PackedIdSet, GridError> {
        self.ensure_unlocked("retrieve")?;
        self.result.clear();

        let stamp = self.next_query_stamp();
        let range = self.cell_range(&query);
        for y in range.y0..=range.y1 {
            let row = y * self.cells_wide;
            for x in range.x0..=range.x1 {
                for &id in &self.cells[row + x] {
                    let seen = &mut self.query_stamps[usize::from(id)];
                    if *seen == stamp {
                        continue;
                    }
                    *seen = stamp;
                    if live.is_live(id) {
                        self.result.add(id);
                    }
                }
            }
        }

        Ok(&self.result)
    }

    /// Returns the first live id in cells overlapping `query` that satisfies
    /// `predicate`, without visiting the rest.
    ///
    /// # Errors
    ///
    /// [`GridError::Locked`] outside the tick window.
    pub fn first_match<C, P>(
        &mut self,
        live: &C,
        query: Aabb,
        mut predicate: P,
    ) -> Result<Option<u16>, GridError>
    where
        C: Occupancy + ?Sized,
        P: FnMut(u16) -> bool,
    {
        self.ensure_unlocked("query")?;

        let stamp = self.next_query_stamp();
        let range = self.cell_range(&query);
        for y in range.y0..=range.y1 {
            let row = y * self.cells_wide;
            for x in range.x0..=range.x1 {
                for &id in &self.cells[row + x] {
                    let seen = &mut self.query_stamps[usize::from(id)];
                    if *seen == stamp {
                        continue;
                    }
                    *seen = stamp;
                    if live.is_live(id) && predicate(id) {
                        return Ok(Some(id));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Invokes `callback(ctx, low, high)` once for every unordered pair of
    /// distinct live ids sharing at least one cell.
    ///
    /// Liveness is checked through `ctx` when each pair is visited, so the
    /// callback may release entities and later pairs involving them are
    /// skipped. Returns the number of pairs delivered.
    ///
    /// # Errors
    ///
    /// [`GridError::Locked`] outside the tick window.
    pub fn for_each_collision_pair<C, F>(
        &mut self,
        ctx: &mut C,
        mut callback: F,
    ) -> Result<usize, GridError>
    where
        C: Occupancy + ?Sized,
        F: FnMut(&mut C, u16, u16),
    {
        self.ensure_unlocked("enumerate pairs")?;

        let id_bits = self.config.id_bits;
        if self.pairs_seen.is_empty() {
            let bits = 1usize << (2 * id_bits);
            self.pairs_seen = vec![0; bits.div_ceil(64)];
        }

        let mut delivered = 0;
        for cell in &self.cells {
            if cell.len() < 2 {
                continue;
            }
            for (i, &id_a) in cell.iter().enumerate() {
                for &id_b in &cell[i + 1..] {
                    if id_a == id_b || !ctx.is_live(id_a) || !ctx.is_live(id_b) {
                        continue;
                    }

                    let (low, high) = if id_a < id_b { (id_a, id_b) } else { (id_b, id_a) };
                    let key = (usize::from(low) << id_bits) | usize::from(high);
                    let word = &mut self.pairs_seen[key >> 6];
                    let bit = 1u64 << (key & 63);
                    if *word & bit != 0 {
                        continue;
                    }
                    if *word == 0 {
                        self.touched_words.push(key >> 6);
                    }
                    *word |= bit;

                    callback(&mut *ctx, low, high);
                    delivered += 1;
                }
            }
        }

        for word in self.touched_words.drain(..) {
            self.pairs_seen[word] = 0;
        }

        tracing::trace!(tick = self.tick, pairs = delivered, "collision pairs enumerated");
        Ok(delivered)
    }

    fn ensure_unlocked(&self, operation: &'static str) -> Result<(), GridError> {
        if self.locked {
            tracing::error!(operation, "hash grid accessed outside of a tick");
            return Err(GridError::Locked { operation });
        }
        Ok(())
    }

    /// Stamps stay within `1..=0xFFFF`; 0 marks "never visited".
    ///
    /// Wrapping clears every recorded stamp so ids seen by an old query with
    /// the same number are not skipped.
    fn next_query_stamp(&mut self) -> u16 {
        self.last_query = if self.last_query == u16::MAX {
            self.query_stamps.fill(0);
            1
        } else {
            self.last_query + 1
        };
        self.last_query
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cell_range(&self, aabb: &Aabb) -> CellRange {
        let cell_size = self.config.cell_size();
        let to_cell = |value: f32, origin: f32, cells: usize| -> usize {
            let cell = ((value - origin) / cell_size).floor();
            if cell.is_nan() || cell <= 0.0 {
                0
            } else {
                (cell as usize).min(cells - 1)
            }
        };

        let (min, max) = (aabb.min(), aabb.max());
        CellRange {
            x0: to_cell(min.x, self.origin.x, self.cells_wide),
            y0: to_cell(min.y, self.origin.y, self.cells_high),
            x1: to_cell(max.x, self.origin.x, self.cells_wide),
            y1: to_cell(max.y, self.origin.y, self.cells_high),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_set(ids: &[u16]) -> PackedIdSet {
        let mut set = PackedIdSet::with_capacity(256);
        for &id in ids {
            set.add(id);
        }
        set
    }

    fn open_grid() -> HashGrid {
        let mut grid = HashGrid::new(GridConfig::for_capacity(256));
        grid.begin_tick(1, Bounds::new(2048.0, 2048.0));
        grid
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn new_grid_is_locked() {
            let mut grid = HashGrid::new(GridConfig::for_capacity(16));
            assert!(grid.is_locked());
            assert_eq!(
                grid.insert(0, Aabb::square(Vec2::ZERO, 1.0)),
                Err(GridError::Locked { operation: "insert" })
            );
        }

        #[test]
        fn begin_tick_sizes_cells_from_bounds() {
            let mut grid = HashGrid::new(GridConfig::for_capacity(16));
            grid.begin_tick(3, Bounds::new(1000.0, 300.0));
            assert!(!grid.is_locked());
            assert_eq!(grid.tick(), 3);
            // 1000 / 256 -> 4 cells, 300 / 256 -> 2 cells
            assert_eq!(grid.dimensions(), (4, 2));
        }

        #[test]
        fn end_tick_locks_every_operation() {
            let mut grid = open_grid();
            grid.insert(1, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.end_tick(1);

            let live = live_set(&[1]);
            assert!(matches!(
                grid.retrieve(&live, Aabb::square(Vec2::ZERO, 5.0)),
                Err(GridError::Locked { .. })
            ));
            assert!(matches!(
                grid.first_match(&live, Aabb::square(Vec2::ZERO, 5.0), |_| true),
                Err(GridError::Locked { .. })
            ));
            let mut ctx = live.clone();
            assert!(matches!(
                grid.for_each_collision_pair(&mut ctx, |_, _, _| {}),
                Err(GridError::Locked { .. })
            ));
        }

        #[test]
        fn buckets_do_not_survive_into_next_tick() {
            let mut grid = open_grid();
            grid.insert(1, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.end_tick(1);
            grid.begin_tick(2, Bounds::new(2048.0, 2048.0));

            let live = live_set(&[1]);
            let found = grid.retrieve(&live, Aabb::square(Vec2::ZERO, 50.0)).unwrap();
            assert!(found.is_empty());
        }

        #[test]
        fn insert_rejects_ids_beyond_capacity() {
            let mut grid = HashGrid::new(GridConfig::for_capacity(16));
            grid.begin_tick(1, Bounds::new(512.0, 512.0));
            assert_eq!(
                grid.insert(16, Aabb::square(Vec2::ZERO, 1.0)),
                Err(GridError::IdOutOfRange { id: 16, capacity: 16 })
            );
        }

        #[test]
        fn config_for_capacity_rounds_up() {
            assert_eq!(GridConfig::for_capacity(16).id_bits, 4);
            assert_eq!(GridConfig::for_capacity(17).id_bits, 5);
            assert_eq!(GridConfig::for_capacity(1 << 20).id_bits, ENTITY_ID_BITS);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn retrieve_finds_covering_box() {
            let mut grid = open_grid();
            grid.insert(4, Aabb::square(Vec2::new(300.0, 300.0), 20.0))
                .unwrap();

            let live = live_set(&[4]);
            let found = grid
                .retrieve(&live, Aabb::square(Vec2::new(300.0, 300.0), 20.0))
                .unwrap();
            assert!(found.has(4));
        }

        #[test]
        fn retrieve_skips_disjoint_cells() {
            let mut grid = open_grid();
            grid.insert(4, Aabb::square(Vec2::new(-900.0, -900.0), 10.0))
                .unwrap();

            let live = live_set(&[4]);
            let found = grid
                .retrieve(&live, Aabb::square(Vec2::new(900.0, 900.0), 10.0))
                .unwrap();
            assert!(found.is_empty());
        }

        #[test]
        fn retrieve_lists_spanning_entity_once() {
            let mut grid = open_grid();
            // Spans a 3x3 block of cells.
            grid.insert(9, Aabb::square(Vec2::ZERO, 300.0)).unwrap();

            let live = live_set(&[9]);
            let found = grid.retrieve(&live, Aabb::square(Vec2::ZERO, 400.0)).unwrap();
            assert_eq!(found.iter().collect::<Vec<_>>(), vec![9]);
        }

        #[test]
        fn retrieve_skips_dead_ids() {
            let mut grid = open_grid();
            grid.insert(1, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.insert(2, Aabb::square(Vec2::ZERO, 5.0)).unwrap();

            let live = live_set(&[2]);
            let found = grid.retrieve(&live, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            assert_eq!(found.iter().collect::<Vec<_>>(), vec![2]);
        }

        #[test]
        fn entities_outside_bounds_land_in_edge_cells() {
            let mut grid = open_grid();
            grid.insert(5, Aabb::square(Vec2::new(1200.0, 0.0), 10.0))
                .unwrap();

            let live = live_set(&[5]);
            let found = grid
                .retrieve(&live, Aabb::square(Vec2::new(1000.0, 0.0), 10.0))
                .unwrap();
            assert!(found.has(5));
        }

        #[test]
        fn first_match_short_circuits() {
            let mut grid = open_grid();
            for id in 0..10 {
                grid.insert(id, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            }

            let live = live_set(&(0..10).collect::<Vec<_>>());
            let mut visited = 0;
            let hit = grid
                .first_match(&live, Aabb::square(Vec2::ZERO, 5.0), |id| {
                    visited += 1;
                    id == 3
                })
                .unwrap();
            assert_eq!(hit, Some(3));
            assert_eq!(visited, 4);
        }

        #[test]
        fn first_match_returns_none_without_match() {
            let mut grid = open_grid();
            grid.insert(1, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            let live = live_set(&[1]);
            let hit = grid
                .first_match(&live, Aabb::square(Vec2::ZERO, 5.0), |_| false)
                .unwrap();
            assert_eq!(hit, None);
        }

        #[test]
        fn query_stamp_wraps_to_one() {
            let mut grid = open_grid();
            grid.insert(1, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.last_query = u16::MAX;

            let live = live_set(&[1]);
            let found = grid.retrieve(&live, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            assert!(found.has(1));
            assert_eq!(grid.last_query, 1);
        }

        #[test]
        fn ids_seen_before_wrap_are_found_after_it() {
            let mut grid = open_grid();
            grid.insert(1, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.insert(2, Aabb::square(Vec2::new(600.0, 600.0), 5.0)).unwrap();
            let live = live_set(&[1, 2]);

            assert!(grid.retrieve(&live, Aabb::square(Vec2::ZERO, 5.0)).unwrap().has(1));
            assert_eq!(grid.last_query, 1);
            for _ in 0..u16::MAX - 1 {
                grid.retrieve(&live, Aabb::square(Vec2::new(600.0, 600.0), 5.0))
                    .unwrap();
            }
            assert_eq!(grid.last_query, u16::MAX);

            let found = grid.retrieve(&live, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            assert!(found.has(1));
            assert!(!found.has(2));
            assert_eq!(grid.last_query, 1);
        }
    }

    mod pair_tests {
        use super::*;

        fn collect_pairs(grid: &mut HashGrid, live: &mut PackedIdSet) -> Vec<(u16, u16)> {
            let mut pairs = Vec::new();
            grid.for_each_collision_pair(live, |_, a, b| pairs.push((a, b)))
                .unwrap();
            pairs
        }

        #[test]
        fn pairs_are_ordered_low_high() {
            let mut grid = open_grid();
            grid.insert(20, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.insert(3, Aabb::square(Vec2::ZERO, 5.0)).unwrap();

            let mut live = live_set(&[3, 20]);
            assert_eq!(collect_pairs(&mut grid, &mut live), vec![(3, 20)]);
        }

        #[test]
        fn three_entities_in_two_cells_yield_three_pairs() {
            let mut grid = open_grid();
            // All three straddle the cell boundary at x = 0.
            for id in [1, 2, 3] {
                grid.insert(id, Aabb::new(Vec2::new(0.0, 100.0), Vec2::new(10.0, 5.0)))
                    .unwrap();
            }

            let mut live = live_set(&[1, 2, 3]);
            let mut pairs = collect_pairs(&mut grid, &mut live);
            pairs.sort_unstable();
            assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 3)]);
        }

        #[test]
        fn lonely_entity_produces_no_pairs() {
            let mut grid = open_grid();
            grid.insert(1, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.insert(2, Aabb::square(Vec2::new(800.0, 800.0), 5.0))
                .unwrap();

            let mut live = live_set(&[1, 2]);
            assert!(collect_pairs(&mut grid, &mut live).is_empty());
        }

        #[test]
        fn duplicate_insert_never_pairs_with_itself() {
            let mut grid = open_grid();
            grid.insert(7, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.insert(7, Aabb::square(Vec2::ZERO, 5.0)).unwrap();

            let mut live = live_set(&[7]);
            assert!(collect_pairs(&mut grid, &mut live).is_empty());
        }

        #[test]
        fn released_entities_are_skipped_mid_enumeration() {
            let mut grid = open_grid();
            for id in [1, 2, 3] {
                grid.insert(id, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            }

            let mut live = live_set(&[1, 2, 3]);
            let mut pairs = Vec::new();
            grid.for_each_collision_pair(&mut live, |live, a, b| {
                pairs.push((a, b));
                live.remove(b);
            })
            .unwrap();
            // (1, 2) is delivered and releases 2; (1, 3) then releases 3.
            assert_eq!(pairs, vec![(1, 2), (1, 3)]);
        }

        #[test]
        fn enumeration_can_repeat_within_a_tick() {
            let mut grid = open_grid();
            grid.insert(1, Aabb::square(Vec2::ZERO, 5.0)).unwrap();
            grid.insert(2, Aabb::square(Vec2::ZERO, 5.0)).unwrap();

            let mut live = live_set(&[1, 2]);
            assert_eq!(collect_pairs(&mut grid, &mut live).len(), 1);
            assert_eq!(collect_pairs(&mut grid, &mut live).len(), 1);
        }
    }
}
