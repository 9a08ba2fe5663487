//! Packed id sets: one bit per possible entity id.
//!
//! A [`PackedIdSet`] is the result buffer of grid queries. It is allocated
//! once and cleared between queries, so hot query paths never allocate.

use std::fmt;
use std::sync::OnceLock;

use crate::MAX_ENTITY_COUNT;

const WORD_BITS: usize = u64::BITS as usize;
const WORD_SHIFT: usize = 6;

/// Fixed-capacity bitset over entity ids.
#[derive(Clone, PartialEq, Eq)]
pub struct PackedIdSet {
    words: Vec<u64>,
    capacity: usize,
}

impl PackedIdSet {
    /// Creates an empty set able to hold ids `0..capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    /// Creates an empty set sized for [`MAX_ENTITY_COUNT`] ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITY_COUNT)
    }

    /// The shared "every id" set.
    ///
    /// Callers with an unbounded view range use this instead of walking the
    /// grid. It is immutable, so one instance serves every world in the
    /// process.
    #[must_use]
    pub fn full() -> &'static PackedIdSet {
        static FULL: OnceLock<PackedIdSet> = OnceLock::new();
        FULL.get_or_init(|| {
            let mut set = PackedIdSet::new();
            set.words.fill(u64::MAX);
            set
        })
    }

    /// Number of ids this set can address.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts `id`.
    #[inline]
    pub fn add(&mut self, id: u16) {
        let (word, bit) = Self::locate(id);
        self.words[word] |= bit;
    }

    /// Removes `id`.
    #[inline]
    pub fn remove(&mut self, id: u16) {
        let (word, bit) = Self::locate(id);
        self.words[word] &= !bit;
    }

    /// Returns true if `id` is in the set. Ids beyond the capacity are never present.
    #[inline]
    #[must_use]
    pub fn has(&self, id: u16) -> bool {
        let (word, bit) = Self::locate(id);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// Removes every id.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Number of ids in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns true if no id is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Iterates the ids in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words,
            index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    #[inline]
    fn locate(id: u16) -> (usize, u64) {
        let id = usize::from(id);
        (id >> WORD_SHIFT, 1u64 << (id & (WORD_BITS - 1)))
    }
}

impl Default for PackedIdSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PackedIdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedIdSet")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a PackedIdSet {
    type Item = u16;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<u16> for PackedIdSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        let mut set = PackedIdSet::new();
        for id in iter {
            set.add(id);
        }
        set
    }
}

/// Ascending iterator over the ids of a [`PackedIdSet`].
#[derive(Debug)]
pub struct Iter<'a> {
    words: &'a [u64],
    index: usize,
    current: u64,
}

impl Iterator for Iter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        while self.current == 0 {
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        u16::try_from(self.index * WORD_BITS + bit).ok()
    }
}
