//! # Sparse Column
//!
//! Membership set over entity ids with O(1) add, remove and lookup.
//!
//! ```text
//! dense:  [3, 1, 4]           members, in insertion order (modulo removals)
//! sparse: [_, 1, _, 0, 2]     sparse[id] = position in dense, if a member
//! count:  3
//! ```
//!
//! `sparse` is never cleared: a stale entry is told apart from a live one by
//! checking it points back, i.e. `dense[sparse[id]] == id` within `count`.
//!
//! Removal swaps the last member into the hole, so dense order is not
//! stable across removals.

use std::fmt;
use std::mem;

use super::{grown_capacity, validate_sorted, EntityId};
use crate::error::{CheckPolicy, SheetError, SheetResult};

/// Payload-free sparse set of entity ids.
#[derive(Clone, Debug)]
pub struct SparseColumn {
    /// Members in dense order; only `..count` is meaningful.
    dense: Vec<EntityId>,
    /// Dense position of each id; may hold stale values.
    sparse: Vec<u32>,
    /// Number of members.
    count: usize,
    /// Entity rows covered.
    n_entities: usize,
    /// Error reporting policy.
    policy: CheckPolicy,
}

impl Default for SparseColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseColumn {
    /// Creates an empty set with no capacity.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_policy(CheckPolicy::Report)
    }

    /// Creates an empty set that reports errors under `policy`.
    #[must_use]
    pub const fn with_policy(policy: CheckPolicy) -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            count: 0,
            n_entities: 0,
            policy,
        }
    }

    /// Creates an empty set able to address ids below `capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::sized(capacity, 0, CheckPolicy::Report)
    }

    pub(crate) fn sized(capacity: usize, n_entities: usize, policy: CheckPolicy) -> Self {
        Self {
            dense: vec![EntityId::default(); capacity],
            sparse: vec![0; capacity],
            count: 0,
            n_entities,
            policy,
        }
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Alias of [`SparseColumn::len`].
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Whether the set has no members.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Entity rows covered.
    #[inline]
    #[must_use]
    pub const fn n_entities(&self) -> usize {
        self.n_entities
    }

    /// Highest addressable id plus one.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub(crate) const fn policy(&self) -> CheckPolicy {
        self.policy
    }

    /// Members in dense order.
    #[inline]
    #[must_use]
    pub fn dense(&self) -> &[EntityId] {
        &self.dense[..self.count]
    }

    /// Iterates members in dense order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.dense().iter().copied()
    }

    /// Finds the dense position of `id`.
    ///
    /// Returns `None` for non-members, including ids past the capacity.
    #[inline]
    #[must_use]
    pub fn search(&self, id: EntityId) -> Option<usize> {
        let slot = *self.sparse.get(id.index())? as usize;
        (slot < self.count && self.dense[slot] == id).then_some(slot)
    }

    /// Membership test.
    #[inline]
    #[must_use]
    pub fn has_component(&self, id: EntityId) -> bool {
        self.search(id).is_some()
    }

    /// Adds `id` to the set.
    ///
    /// # Returns
    ///
    /// The dense position the id was written to.
    ///
    /// # Errors
    ///
    /// - [`SheetError::Bounds`] if `id` is not below the capacity
    /// - [`SheetError::DuplicateComponent`] if `id` is already a member
    /// - [`SheetError::CapacityExceeded`] if the dense array is full
    pub fn add_component(&mut self, id: EntityId) -> SheetResult<usize> {
        let capacity = self.capacity();
        if id.index() >= capacity {
            return self.policy.fail(SheetError::Bounds {
                what: "entity",
                index: id.index(),
                limit: capacity,
            });
        }
        if self.has_component(id) {
            return self.policy.fail(SheetError::DuplicateComponent { entity: id });
        }
        if self.count >= capacity {
            return self.policy.fail(SheetError::CapacityExceeded {
                needed: self.count + 1,
                capacity,
            });
        }
        let slot = self.count;
        self.push_member(id);
        Ok(slot)
    }

    /// Removes `id` by moving the last member into its place.
    ///
    /// # Returns
    ///
    /// The dense position that was vacated and refilled, or `None` if `id`
    /// was not a member (no-op).
    pub fn remove_component(&mut self, id: EntityId) -> Option<usize> {
        let slot = self.search(id)?;
        self.count -= 1;
        let last = self.dense[self.count];
        self.dense[slot] = last;
        self.sparse[last.index()] = slot as u32;
        Some(slot)
    }

    /// Grows the entity count by `n`, reallocating if needed.
    pub fn push_entities(&mut self, n: usize) {
        self.pre_push(n);
        self.n_entities += n;
    }

    /// Ensures ids up to `n_entities + n` are addressable.
    pub fn pre_push(&mut self, n: usize) {
        if let Some(capacity) = grown_capacity(self.capacity(), self.n_entities, n) {
            tracing::debug!(
                old_capacity = self.capacity(),
                new_capacity = capacity,
                "sparse column reallocated"
            );
            self.reallocate(capacity);
        }
    }

    /// Removes the `n` most recently added entities.
    ///
    /// Memberships of the removed ids are dropped too, so re-adding an
    /// entity at the same id starts out without the component.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] if fewer than `n` entities exist.
    pub fn pop_entities(&mut self, n: usize) -> SheetResult<()> {
        if n > self.n_entities {
            return self.policy.fail(SheetError::Bounds {
                what: "pop count",
                index: n,
                limit: self.n_entities + 1,
            });
        }
        let remaining = self.n_entities - n;
        // Walk backwards: the member swapped into a hole has been visited
        let mut slot = self.count;
        while slot > 0 {
            slot -= 1;
            let id = self.dense[slot];
            if id.index() >= remaining {
                self.remove_component(id);
            }
        }
        self.n_entities = remaining;
        Ok(())
    }

    /// Drops all members and entities, keeping capacity.
    pub fn clear(&mut self) {
        self.count = 0;
        self.n_entities = 0;
    }

    /// Removes the entities listed in `garbage` and renumbers the rest.
    ///
    /// Each surviving id drops by the number of removed ids below it, and
    /// the set is rebuilt in ascending id order. Capacity shrinks by
    /// `garbage.len()`.
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsorted`] / [`SheetError::Bounds`] for a bad id list.
    /// The set is unchanged on error.
    pub fn extract_sorted(&mut self, garbage: &[EntityId]) -> SheetResult<()> {
        validate_sorted(garbage, self.n_entities).map_err(|e| self.policy.report(e))?;
        self.compact(garbage);
        Ok(())
    }

    /// Always fails: shifting ids up would have to invent memberships.
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsupported`], unconditionally.
    pub fn insert_sorted(&mut self, _ids: &[EntityId]) -> SheetResult<()> {
        self.policy.fail(SheetError::Unsupported {
            operation: "insert_sorted",
            reason: "sparse sets cannot be renumbered by insertion",
        })
    }

    /// Heap bytes held.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.dense.capacity() * mem::size_of::<EntityId>()
            + self.sparse.capacity() * mem::size_of::<u32>()
    }

    /// Rebuilds the set without `garbage`, which must already be validated.
    ///
    /// # Returns
    ///
    /// For each new dense position, the dense position it came from.
    pub(crate) fn compact(&mut self, garbage: &[EntityId]) -> Vec<usize> {
        let mut survivors: Vec<(EntityId, usize)> = self
            .iter()
            .enumerate()
            .filter(|(_, id)| garbage.binary_search(id).is_err())
            .map(|(slot, id)| (id, slot))
            .collect();
        survivors.sort_unstable_by_key(|&(id, _)| id);

        let mut rebuilt = Self::sized(
            self.capacity() - garbage.len(),
            self.n_entities - garbage.len(),
            self.policy,
        );
        let sources: Vec<usize> = survivors
            .into_iter()
            .map(|(id, slot)| {
                let shift = garbage.partition_point(|g| *g < id);
                rebuilt.push_member(EntityId::from_index(id.index() - shift));
                slot
            })
            .collect();
        *self = rebuilt;
        sources
    }

    /// Makes this set a raw copy of `source`.
    pub(crate) fn copy_from(&mut self, source: &Self) {
        if self.capacity() < source.capacity() {
            self.reallocate(source.capacity());
        }
        self.dense[..source.count].copy_from_slice(source.dense());
        self.sparse[..source.capacity()].copy_from_slice(&source.sparse);
        self.count = source.count;
        self.n_entities = source.n_entities;
    }

    /// Same entity count and same members in the same dense order.
    pub(crate) fn content_eq(&self, other: &Self) -> bool {
        self.n_entities == other.n_entities && self.dense() == other.dense()
    }

    /// Appends `id` without any check.
    pub(crate) fn push_member(&mut self, id: EntityId) {
        self.dense[self.count] = id;
        self.sparse[id.index()] = self.count as u32;
        self.count += 1;
    }

    /// Copy-and-free into exactly `capacity` slots.
    fn reallocate(&mut self, capacity: usize) {
        let mut dense = vec![EntityId::default(); capacity];
        dense[..self.count].copy_from_slice(self.dense());
        let mut sparse = vec![0; capacity];
        sparse[..self.sparse.len()].copy_from_slice(&self.sparse);
        self.dense = dense;
        self.sparse = sparse;
    }
}

impl fmt::Display for SparseColumn {
    /// One line per entity: `x` for members, blank otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..self.n_entities {
            if index > 0 {
                f.write_str("\n")?;
            }
            if self.has_component(EntityId::from_index(index)) {
                f.write_str("x")?;
            }
        }
        Ok(())
    }
}
