//! Per-consumer bookkeeping: remembered versions and the intersection cache.

use std::fmt;

use crate::column::{ColumnId, SparseColumn};

/// Opaque identity of a reader of the sheet (typically one system).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsumerId(u16);

impl ConsumerId {
    /// Creates a consumer id.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Slot in the consumer table.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer {}", self.0)
    }
}

/// Intersection cache counters for one consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Queries answered from the cache.
    pub hits: u64,
    /// Queries that recomputed the intersection.
    pub recomputes: u64,
}

impl CacheStats {
    /// Fraction of queries answered from the cache.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.recomputes;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Last intersection a consumer asked for.
#[derive(Clone, Debug)]
pub(super) struct CachedIntersection {
    /// Columns intersected, in request order.
    pub(super) key: Vec<ColumnId>,
    /// Column versions the result was computed from.
    pub(super) versions: Vec<u64>,
    /// The result.
    pub(super) set: SparseColumn,
}

impl CachedIntersection {
    pub(super) fn is_fresh(&self, key: &[ColumnId], versions: &[u64]) -> bool {
        self.key == key && self.versions == versions
    }
}

/// What one consumer has seen.
#[derive(Clone, Debug)]
pub(super) struct ConsumerMemory {
    /// Last column version observed, per column slot.
    pub(super) seen: Vec<u64>,
    /// Last size version observed.
    pub(super) seen_size: u64,
    /// Most recent intersection.
    pub(super) cache: Option<CachedIntersection>,
    /// Cache counters.
    pub(super) stats: CacheStats,
}

impl ConsumerMemory {
    /// Memory that has seen nothing, so every first query reports a change.
    pub(super) fn new(column_capacity: usize) -> Self {
        Self {
            seen: vec![0; column_capacity],
            seen_size: 0,
            cache: None,
            stats: CacheStats::default(),
        }
    }
}
