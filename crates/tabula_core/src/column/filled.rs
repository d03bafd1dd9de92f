//! # Filled Column
//!
//! Dense storage: one slot per entity id, addressed directly by index.
//!
//! - Access is O(1) via entity index
//! - Iteration is cache-friendly (contiguous memory)
//! - Every entity "has" the component; there is no membership test

use std::iter;

use super::type_info::{CellsDisplay, Element, TypeInfo};
use super::{validate_sorted, EntityId};
use crate::error::{CheckPolicy, SheetError, SheetResult};
use crate::memory::ColumnBuffer;

/// Dense, type-erased column with one row per entity.
///
/// # Example
///
/// ```rust,ignore
/// let mut heat = FilledColumn::new(TypeInfo::of::<f32>(), CheckPolicy::Report);
/// heat.push_entities(3);
/// heat.set(EntityId::new(1), 21.5f32)?;
/// assert_eq!(heat.as_slice::<f32>()?, &[0.0, 21.5, 0.0]);
/// ```
#[derive(Clone, Debug)]
pub struct FilledColumn {
    /// Row storage; `len` is the entity count.
    buffer: ColumnBuffer,
    /// Element descriptor.
    info: TypeInfo,
    /// Error reporting policy.
    policy: CheckPolicy,
}

impl FilledColumn {
    /// Creates an empty column of elements described by `info`.
    ///
    /// # Panics
    ///
    /// Panics if the element is zero-sized.
    #[must_use]
    pub fn new(info: TypeInfo, policy: CheckPolicy) -> Self {
        Self {
            buffer: ColumnBuffer::new(info.size()),
            info,
            policy,
        }
    }

    /// Number of entity rows.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the column has no rows.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Allocated rows.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Element descriptor.
    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> &TypeInfo {
        &self.info
    }

    /// Grows the entity count by `n`, reallocating if needed.
    ///
    /// Slices obtained before this call are invalidated by the borrow.
    pub fn push_entities(&mut self, n: usize) {
        self.pre_push(n);
        self.buffer.set_len(self.buffer.len() + n);
    }

    /// Ensures room for `n` more rows without changing the entity count.
    ///
    /// A slice from [`FilledColumn::as_mut_slice`] taken after this call
    /// covers the reserved rows, so they can be written before they are
    /// committed with `push_entities`.
    pub fn pre_push(&mut self, n: usize) {
        let old = self.buffer.capacity();
        if self.buffer.reserve(n) {
            tracing::debug!(
                element = self.info.name(),
                old_capacity = old,
                new_capacity = self.buffer.capacity(),
                "filled column reallocated"
            );
        }
    }

    /// Removes the `n` most recently added rows. Memory is kept.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] if fewer than `n` rows exist.
    pub fn pop_entities(&mut self, n: usize) -> SheetResult<()> {
        let len = self.buffer.len();
        if n > len {
            return self.policy.fail(SheetError::Bounds {
                what: "pop count",
                index: n,
                limit: len + 1,
            });
        }
        if self.info.zeroed() {
            self.buffer.zero_rows(len - n, len);
        }
        self.buffer.set_len(len - n);
        Ok(())
    }

    /// Drops all rows, keeping capacity.
    pub fn clear(&mut self) {
        if self.info.zeroed() {
            self.buffer.zero_rows(0, self.buffer.len());
        }
        self.buffer.set_len(0);
    }

    /// Reads the value of one entity.
    ///
    /// Any id below the capacity is addressable, including reserved rows.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column, and
    /// [`SheetError::Bounds`] if `id` is not below the capacity.
    pub fn get<T: Element>(&self, id: EntityId) -> SheetResult<T> {
        self.check_type::<T>()?;
        self.check_bounds(id)?;
        Ok(self.buffer.as_full_slice::<T>()[id.index()])
    }

    /// Writes the value of one entity.
    ///
    /// # Errors
    ///
    /// Same as [`FilledColumn::get`]. Nothing is written on error.
    pub fn set<T: Element>(&mut self, id: EntityId, value: T) -> SheetResult<()> {
        self.check_type::<T>()?;
        self.check_bounds(id)?;
        self.buffer.as_mut_slice::<T>()[id.index()] = value;
        Ok(())
    }

    /// Typed view of the live rows.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column.
    pub fn as_slice<T: Element>(&self) -> SheetResult<&[T]> {
        self.check_type::<T>()?;
        Ok(self.buffer.as_slice())
    }

    /// Typed mutable view of every allocated row, reserved ones included.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column.
    pub fn as_mut_slice<T: Element>(&mut self) -> SheetResult<&mut [T]> {
        self.check_type::<T>()?;
        Ok(self.buffer.as_mut_slice())
    }

    /// Raw bytes of the live rows.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.live_bytes()
    }

    /// Iterates the ids of every row.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> {
        (0..self.len()).map(EntityId::from_index)
    }

    /// Printable rendering of the live rows.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] if `T` does not match the column.
    pub fn display<T: Element>(&self) -> SheetResult<CellsDisplay<'_, T>> {
        Ok(CellsDisplay::new(self.as_slice::<T>()?))
    }

    /// Heap bytes held.
    #[inline]
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.buffer.size_in_bytes()
    }

    /// Checks that rows can be removed by [`FilledColumn::extract_sorted`].
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsupported`] for columns of entity ids.
    pub fn check_extract(&self) -> SheetResult<()> {
        if self.info.is_entity_ref() {
            return Err(SheetError::Unsupported {
                operation: "extract_sorted",
                reason: "stored entity ids would not be renumbered",
            });
        }
        Ok(())
    }

    /// Checks that rows can be added by [`FilledColumn::insert_sorted`].
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsupported`] for columns of entity ids.
    pub fn check_insert(&self) -> SheetResult<()> {
        if self.info.is_entity_ref() {
            return Err(SheetError::Unsupported {
                operation: "insert_sorted",
                reason: "stored entity ids would not be renumbered",
            });
        }
        Ok(())
    }

    /// Removes the rows listed in `garbage` and closes the gaps.
    ///
    /// Surviving rows keep their relative order in a fresh buffer whose
    /// capacity shrinks by `garbage.len()`.
    ///
    /// # Arguments
    ///
    /// * `garbage` - Strictly ascending ids below `len`
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsupported`] for columns of entity ids, and
    /// [`SheetError::Unsorted`] / [`SheetError::Bounds`] for a bad id list.
    /// The column is unchanged on error.
    pub fn extract_sorted(&mut self, garbage: &[EntityId]) -> SheetResult<()> {
        let len = self.len();
        self.check_extract()
            .and_then(|()| validate_sorted(garbage, len))
            .map_err(|e| self.policy.report(e))?;
        if garbage.is_empty() {
            return Ok(());
        }

        let stride = self.buffer.stride();
        let source = self.buffer.as_bytes();
        let mut compacted = ColumnBuffer::with_capacity(stride, self.capacity() - garbage.len());
        let target = compacted.as_bytes_mut();
        let mut write = 0;
        let mut start = 0;
        for end in garbage.iter().map(|id| id.index()).chain(iter::once(len)) {
            let run = end - start;
            target[write * stride..(write + run) * stride]
                .copy_from_slice(&source[start * stride..end * stride]);
            write += run;
            start = end + 1;
        }
        compacted.set_len(write);
        self.buffer = compacted;
        Ok(())
    }

    /// Inserts zeroed rows so that each listed id names a new row.
    ///
    /// Ids are positions in the numbering after the insert. Existing rows
    /// shift up past every new row inserted before them.
    ///
    /// # Arguments
    ///
    /// * `ids` - Strictly ascending ids below `len + ids.len()`
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsupported`] for columns of entity ids, and
    /// [`SheetError::Unsorted`] / [`SheetError::Bounds`] for a bad id list.
    pub fn insert_sorted(&mut self, ids: &[EntityId]) -> SheetResult<()> {
        let new_len = self.len() + ids.len();
        self.check_insert()
            .and_then(|()| validate_sorted(ids, new_len))
            .map_err(|e| self.policy.report(e))?;
        if ids.is_empty() {
            return Ok(());
        }

        let stride = self.buffer.stride();
        let source = self.buffer.as_bytes();
        let mut widened = ColumnBuffer::with_capacity(stride, self.capacity() + ids.len());
        let target = widened.as_bytes_mut();
        let mut read = 0;
        let mut write = 0;
        for end in ids.iter().map(|id| id.index()).chain(iter::once(new_len)) {
            let run = end - write;
            target[write * stride..end * stride]
                .copy_from_slice(&source[read * stride..(read + run) * stride]);
            read += run;
            write = end + 1;
        }
        widened.set_len(new_len);
        self.buffer = widened;
        Ok(())
    }

    /// Replaces this column's rows with a raw copy of `source`'s.
    pub(crate) fn copy_from(&mut self, source: &Self) {
        self.clear();
        self.pre_push(source.len());
        let bytes = source.as_bytes();
        self.buffer.as_bytes_mut()[..bytes.len()].copy_from_slice(bytes);
        self.buffer.set_len(source.len());
    }

    /// Byte-level equality of the live rows.
    pub(crate) fn content_eq(&self, other: &Self) -> bool {
        self.info == other.info && self.as_bytes() == other.as_bytes()
    }

    fn check_type<T: Element>(&self) -> SheetResult<()> {
        self.info.check::<T>().map_err(|e| self.policy.report(e))
    }

    fn check_bounds(&self, id: EntityId) -> SheetResult<()> {
        if id.index() < self.capacity() {
            Ok(())
        } else {
            self.policy.fail(SheetError::Bounds {
                what: "entity",
                index: id.index(),
                limit: self.capacity(),
            })
        }
    }
}
