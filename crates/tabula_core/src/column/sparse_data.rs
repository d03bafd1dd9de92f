//! # Sparse Column With Data
//!
//! A [`SparseColumn`] plus one payload row per member, stored in dense
//! order. Every swap the set makes is mirrored in the payload, so
//! `data[i]` always belongs to `dense[i]`.

use super::sparse::SparseColumn;
use super::type_info::{CellsDisplay, Element, TypeInfo};
use super::{validate_sorted, EntityId};
use crate::error::{CheckPolicy, SheetError, SheetResult};
use crate::memory::ColumnBuffer;

/// Sparse set whose members carry a typed payload.
///
/// # Example
///
/// ```rust,ignore
/// let mut speed = SparseColumnWithData::new(TypeInfo::of::<f32>(), CheckPolicy::Report);
/// speed.push_entities(10);
/// speed.insert(EntityId::new(4), 2.5f32)?;
/// assert_eq!(speed.get::<f32>(EntityId::new(4)), Some(&2.5));
/// ```
#[derive(Clone, Debug)]
pub struct SparseColumnWithData {
    /// Membership.
    set: SparseColumn,
    /// Payload; capacity follows the set, `len` follows `count`.
    data: ColumnBuffer,
    /// Element descriptor.
    info: TypeInfo,
}

impl SparseColumnWithData {
    /// Creates an empty column of elements described by `info`.
    #[must_use]
    pub fn new(info: TypeInfo, policy: CheckPolicy) -> Self {
        Self {
            set: SparseColumn::with_policy(policy),
            data: ColumnBuffer::new(info.size()),
            info,
        }
    }

    /// Membership view.
    #[inline]
    #[must_use]
    pub const fn as_set(&self) -> &SparseColumn {
        &self.set
    }

    /// Element descriptor.
    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> &TypeInfo {
        &self.info
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether the column has no members.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Entity rows covered.
    #[inline]
    #[must_use]
    pub const fn n_entities(&self) -> usize {
        self.set.n_entities()
    }

    /// Highest addressable id plus one.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.set.capacity()
    }

    /// Members in dense order.
    #[inline]
    #[must_use]
    pub fn dense(&self) -> &[EntityId] {
        self.set.dense()
    }

    /// Dense position of `id`, if a member.
    #[inline]
    #[must_use]
    pub fn search(&self, id: EntityId) -> Option<usize> {
        self.set.search(id)
    }

    /// Membership test.
    #[inline]
    #[must_use]
    pub fn has_component(&self, id: EntityId) -> bool {
        self.set.has_component(id)
    }

    /// Adds `id` with a zeroed payload.
    ///
    /// # Errors
    ///
    /// Same as [`SparseColumn::add_component`].
    pub fn add_component(&mut self, id: EntityId) -> SheetResult<usize> {
        let slot = self.set.add_component(id)?;
        self.data.set_len(self.set.len());
        self.data.zero_rows(slot, slot + 1);
        Ok(slot)
    }

    /// Adds `id` and writes its payload.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column, plus
    /// everything [`SparseColumn::add_component`] reports.
    pub fn insert<T: Element>(&mut self, id: EntityId, value: T) -> SheetResult<()> {
        self.check_type::<T>()?;
        let slot = self.add_component(id)?;
        self.data.as_mut_slice::<T>()[slot] = value;
        Ok(())
    }

    /// Removes `id`, moving the last member and its payload into the hole.
    ///
    /// Returns the vacated dense position, or `None` if `id` was absent.
    pub fn remove_component(&mut self, id: EntityId) -> Option<usize> {
        let slot = self.set.remove_component(id)?;
        let last = self.set.len();
        if slot != last {
            self.data.copy_row(last, slot);
        }
        self.data.set_len(last);
        Some(slot)
    }

    /// Payload of `id`.
    ///
    /// Returns `None` if `id` is not a member. A type mismatch is reported
    /// under the column's policy and also yields `None`.
    #[must_use]
    pub fn get<T: Element>(&self, id: EntityId) -> Option<&T> {
        let slot = self.search(id)?;
        self.data::<T>().ok().map(|data| &data[slot])
    }

    /// Mutable payload of `id`.
    ///
    /// Same rules as [`SparseColumnWithData::get`].
    pub fn get_mut<T: Element>(&mut self, id: EntityId) -> Option<&mut T> {
        let slot = self.search(id)?;
        self.data_mut::<T>().ok().map(|data| &mut data[slot])
    }

    /// Overwrites the payload of an existing member.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column and
    /// [`SheetError::MissingComponent`] if `id` is not a member.
    pub fn set<T: Element>(&mut self, id: EntityId, value: T) -> SheetResult<()> {
        self.check_type::<T>()?;
        match self.search(id) {
            Some(slot) => {
                self.data.as_mut_slice::<T>()[slot] = value;
                Ok(())
            }
            None => self.set.policy().fail(SheetError::MissingComponent { entity: id }),
        }
    }

    /// Payloads in dense order.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column.
    pub fn data<T: Element>(&self) -> SheetResult<&[T]> {
        self.check_type::<T>()?;
        Ok(self.data.as_slice())
    }

    /// Mutable payloads in dense order.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column.
    pub fn data_mut<T: Element>(&mut self) -> SheetResult<&mut [T]> {
        self.check_type::<T>()?;
        let len = self.len();
        Ok(&mut self.data.as_mut_slice()[..len])
    }

    /// Iterates `(id, payload)` pairs in dense order.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column.
    pub fn iter<T: Element>(&self) -> SheetResult<impl Iterator<Item = (EntityId, &T)> + '_> {
        Ok(self.set.iter().zip(self.data::<T>()?))
    }

    /// Printable rendering of the payloads, in dense order.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column.
    pub fn display<T: Element>(&self) -> SheetResult<CellsDisplay<'_, T>> {
        Ok(CellsDisplay::new(self.data::<T>()?))
    }

    /// Grows the entity count by `n`, reallocating if needed.
    pub fn push_entities(&mut self, n: usize) {
        self.set.push_entities(n);
        self.follow_capacity();
    }

    /// Ensures ids up to `n_entities + n` are addressable.
    pub fn pre_push(&mut self, n: usize) {
        self.set.pre_push(n);
        self.follow_capacity();
    }

    /// Removes the `n` most recently added entities and their payloads.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] if fewer than `n` entities exist.
    pub fn pop_entities(&mut self, n: usize) -> SheetResult<()> {
        let n_entities = self.n_entities();
        if n <= n_entities {
            let remaining = n_entities - n;
            let doomed: Vec<EntityId> = self
                .set
                .iter()
                .filter(|id| id.index() >= remaining)
                .collect();
            for id in doomed {
                self.remove_component(id);
            }
        }
        self.set.pop_entities(n)
    }

    /// Drops all members, payloads and entities, keeping capacity.
    pub fn clear(&mut self) {
        self.set.clear();
        self.data.set_len(0);
    }

    /// Removes the listed entities, renumbers the rest and moves payloads
    /// along. See [`SparseColumn::extract_sorted`].
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsorted`] / [`SheetError::Bounds`] for a bad id list.
    pub fn extract_sorted(&mut self, garbage: &[EntityId]) -> SheetResult<()> {
        validate_sorted(garbage, self.n_entities()).map_err(|e| self.set.policy().report(e))?;
        let sources = self.set.compact(garbage);
        let mut data = ColumnBuffer::with_capacity(self.data.stride(), self.set.capacity());
        data.set_len(sources.len());
        for (slot, &source) in sources.iter().enumerate() {
            data.row_mut(slot).copy_from_slice(self.data.row(source));
        }
        self.data = data;
        Ok(())
    }

    /// Always fails, as for [`SparseColumn::insert_sorted`].
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsupported`], unconditionally.
    pub fn insert_sorted(&mut self, ids: &[EntityId]) -> SheetResult<()> {
        self.set.insert_sorted(ids)
    }

    /// Heap bytes held.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.set.size_in_bytes() + self.data.size_in_bytes()
    }

    /// Makes this column a raw copy of `source`.
    pub(crate) fn copy_from(&mut self, source: &Self) {
        self.set.copy_from(&source.set);
        let mut data = ColumnBuffer::with_capacity(self.data.stride(), self.set.capacity());
        let bytes = source.data.live_bytes();
        data.as_bytes_mut()[..bytes.len()].copy_from_slice(bytes);
        data.set_len(source.len());
        self.data = data;
    }

    /// Same members in the same order with byte-identical payloads.
    pub(crate) fn content_eq(&self, other: &Self) -> bool {
        self.info == other.info
            && self.set.content_eq(&other.set)
            && self.data.live_bytes() == other.data.live_bytes()
    }

    /// Keeps payload capacity in lockstep with the set.
    fn follow_capacity(&mut self) {
        if self.data.capacity() != self.set.capacity() {
            self.data.reallocate(self.set.capacity());
        }
    }

    fn check_type<T: Element>(&self) -> SheetResult<()> {
        self.info
            .check::<T>()
            .map_err(|e| self.set.policy().report(e))
    }
}
