//! # Queryable Sheet
//!
//! Change tracking layered over a [`Sheet`].
//!
//! Every column carries a version, bumped whenever a consumer takes write
//! access to it. One more version tracks the entity count. Each consumer
//! remembers the versions it last observed, so it can ask "did this change
//! since I last looked?" without diffing any data.
//!
//! ```text
//! versions:    col#0=3  col#1=1  col#2=7   size=2
//! consumer 0:  col#0=3  col#1=0  col#2=5   size=2   -> #1, #2 changed
//! consumer 1:  col#0=1  col#1=1  col#2=7   size=1   -> #0, size changed
//! ```
//!
//! Versions start at 1 and memories at 0, so a fresh consumer sees every
//! column as changed on its first query.
//!
//! Each consumer also caches its most recent intersection. The cache is
//! reused while the requested columns and their versions are unchanged.

mod consumer;

use crate::column::{
    intersection_of, Column, ColumnId, ColumnKind, Element, EntityId, FilledColumn, SparseColumn,
    SparseColumnWithData, TypeInfo,
};
use crate::error::{SheetError, SheetResult};
use crate::sheet::Sheet;

pub use consumer::{CacheStats, ConsumerId};
use consumer::{CachedIntersection, ConsumerMemory};

/// A [`Sheet`] plus per-column versions and per-consumer memory.
///
/// # Example
///
/// ```rust,ignore
/// let mut query = QueryableSheet::new(sheet, 2);
/// let physics = ConsumerId::new(0);
///
/// let (_, changed) = query.read_changed(physics, HEAT)?;
/// assert!(changed); // first look
///
/// let both = query.intersection(physics, BURNING, FLAMMABLE)?;
/// for id in both.iter() { /* ... */ }
/// ```
#[derive(Debug)]
pub struct QueryableSheet {
    /// Underlying storage.
    sheet: Sheet,
    /// Version of each column slot.
    versions: Vec<u64>,
    /// Version of the entity count.
    size_version: u64,
    /// Memory of each registered consumer.
    consumers: Vec<ConsumerMemory>,
}

impl QueryableSheet {
    /// Wraps `sheet` and registers `n_consumers` consumers, with ids
    /// `0..n_consumers`.
    #[must_use]
    pub fn new(sheet: Sheet, n_consumers: usize) -> Self {
        let slots = sheet.column_capacity();
        Self {
            sheet,
            versions: vec![1; slots],
            size_version: 1,
            consumers: (0..n_consumers).map(|_| ConsumerMemory::new(slots)).collect(),
        }
    }

    /// Registers one more consumer.
    pub fn register_consumer(&mut self) -> ConsumerId {
        let id = ConsumerId::new(self.consumers.len() as u16);
        self.consumers
            .push(ConsumerMemory::new(self.sheet.column_capacity()));
        tracing::debug!(consumer = %id, "consumer registered");
        id
    }

    /// Number of registered consumers.
    #[inline]
    #[must_use]
    pub fn n_consumers(&self) -> usize {
        self.consumers.len()
    }

    /// The underlying sheet, read-only.
    #[inline]
    #[must_use]
    pub const fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    /// Unwraps the sheet, discarding all tracking.
    #[must_use]
    pub fn into_inner(self) -> Sheet {
        self.sheet
    }

    /// Current version of a column slot.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] if `column` is past the column capacity.
    pub fn version(&self, column: ColumnId) -> SheetResult<u64> {
        match self.versions.get(column.index()) {
            Some(&version) => Ok(version),
            None => self.sheet.config().check_policy.fail(SheetError::Bounds {
                what: "column",
                index: column.index(),
                limit: self.versions.len(),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads a column without touching any bookkeeping.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] if nothing is registered at `column`.
    pub fn read(&self, column: ColumnId) -> SheetResult<&Column> {
        self.sheet.column(column)
    }

    /// Reads a column and reports whether it changed since this consumer
    /// last asked.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] for an unknown consumer and
    /// [`SheetError::MissingColumn`] for an unregistered column. Nothing is
    /// remembered on error.
    pub fn read_changed(
        &mut self,
        consumer: ConsumerId,
        column: ColumnId,
    ) -> SheetResult<(&Column, bool)> {
        self.check_consumer(consumer)?;
        let found = self.sheet.column(column)?;
        let version = self.versions[column.index()];
        let seen = &mut self.consumers[consumer.index()].seen[column.index()];
        let changed = *seen != version;
        *seen = version;
        Ok((found, changed))
    }

    /// Typed view of a dense column's live rows, without bookkeeping.
    ///
    /// # Errors
    ///
    /// See [`Sheet::get_array`].
    pub fn read_array<T: Element>(&self, column: ColumnId) -> SheetResult<&[T]> {
        self.sheet.get_array(column)
    }

    /// Whether the entity count changed since this consumer last asked.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] for an unknown consumer.
    pub fn did_size_change(&mut self, consumer: ConsumerId) -> SheetResult<bool> {
        self.check_consumer(consumer)?;
        let memory = &mut self.consumers[consumer.index()];
        let changed = memory.seen_size != self.size_version;
        memory.seen_size = self.size_version;
        Ok(changed)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Takes write access to a column, bumping its version.
    ///
    /// The bump is unconditional: taking access counts as a change whether
    /// or not anything is written.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] for an unknown consumer and
    /// [`SheetError::MissingColumn`] for an unregistered column.
    pub fn write(&mut self, consumer: ConsumerId, column: ColumnId) -> SheetResult<&mut Column> {
        self.check_consumer(consumer)?;
        let found = self.sheet.column_mut(column)?;
        self.versions[column.index()] += 1;
        Ok(found)
    }

    /// Write access to a dense column.
    ///
    /// # Errors
    ///
    /// As [`QueryableSheet::write`], plus [`SheetError::WrongKind`].
    pub fn write_filled(
        &mut self,
        consumer: ConsumerId,
        column: ColumnId,
    ) -> SheetResult<&mut FilledColumn> {
        self.check_consumer(consumer)?;
        let found = self.sheet.filled_mut(column)?;
        self.versions[column.index()] += 1;
        Ok(found)
    }

    /// Write access to a payload-free sparse column.
    ///
    /// # Errors
    ///
    /// As [`QueryableSheet::write`], plus [`SheetError::WrongKind`].
    pub fn write_sparse(
        &mut self,
        consumer: ConsumerId,
        column: ColumnId,
    ) -> SheetResult<&mut SparseColumn> {
        self.check_consumer(consumer)?;
        let found = self.sheet.sparse_mut(column)?;
        self.versions[column.index()] += 1;
        Ok(found)
    }

    /// Write access to a sparse column with payload.
    ///
    /// # Errors
    ///
    /// As [`QueryableSheet::write`], plus [`SheetError::WrongKind`].
    pub fn write_sparse_with_data(
        &mut self,
        consumer: ConsumerId,
        column: ColumnId,
    ) -> SheetResult<&mut SparseColumnWithData> {
        self.check_consumer(consumer)?;
        let found = self.sheet.sparse_with_data_mut(column)?;
        self.versions[column.index()] += 1;
        Ok(found)
    }

    /// Typed write access to a dense column, reserved rows included.
    ///
    /// # Errors
    ///
    /// As [`QueryableSheet::write_filled`], plus
    /// [`SheetError::TypeMismatch`].
    pub fn write_array<T: Element>(
        &mut self,
        consumer: ConsumerId,
        column: ColumnId,
    ) -> SheetResult<&mut [T]> {
        self.write_filled(consumer, column)?.as_mut_slice()
    }

    // =========================================================================
    // Columns and entities
    // =========================================================================

    /// Registers a column. See [`Sheet::add_column`].
    ///
    /// # Errors
    ///
    /// See [`Sheet::add_column`].
    pub fn add_column(
        &mut self,
        id: ColumnId,
        kind: ColumnKind,
        info: Option<TypeInfo>,
    ) -> SheetResult<&mut Column> {
        let column = self.sheet.add_column(id, kind, info)?;
        self.versions[id.index()] += 1;
        Ok(column)
    }

    /// Unregisters a column. See [`Sheet::remove_column`].
    pub fn remove_column(&mut self, id: ColumnId) -> Option<Column> {
        let column = self.sheet.remove_column(id)?;
        self.versions[id.index()] += 1;
        Some(column)
    }

    /// Appends `n` entities. Every column may have been reallocated, so
    /// every version is bumped along with the size version.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] for an unknown consumer.
    pub fn add_entities(&mut self, consumer: ConsumerId, n: usize) -> SheetResult<EntityId> {
        self.check_consumer(consumer)?;
        let first = self.sheet.add_entities(n)?;
        self.bump_all();
        Ok(first)
    }

    /// Reserves room for `n` more entities. See [`Sheet::pre_add_entities`].
    ///
    /// Buffers may move, so column versions are bumped. The entity count
    /// does not change and neither does the size version.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] for an unknown consumer.
    pub fn pre_add_entities(&mut self, consumer: ConsumerId, n: usize) -> SheetResult<()> {
        self.check_consumer(consumer)?;
        self.sheet.pre_add_entities(n);
        self.bump_columns();
        Ok(())
    }

    /// Removes the `n` most recently added entities.
    ///
    /// # Errors
    ///
    /// See [`Sheet::pop_entities`]. Versions are unchanged on error.
    pub fn pop_entities(&mut self, consumer: ConsumerId, n: usize) -> SheetResult<()> {
        self.check_consumer(consumer)?;
        self.sheet.pop_entities(n)?;
        self.bump_all();
        Ok(())
    }

    /// Removes and renumbers entities.
    ///
    /// # Errors
    ///
    /// See [`Sheet::extract_entities_sorted`].
    pub fn extract_entities_sorted(
        &mut self,
        consumer: ConsumerId,
        garbage: &[EntityId],
    ) -> SheetResult<()> {
        self.check_consumer(consumer)?;
        self.sheet.extract_entities_sorted(garbage)?;
        self.bump_all();
        Ok(())
    }

    /// Inserts default entities.
    ///
    /// # Errors
    ///
    /// See [`Sheet::insert_entities_sorted`].
    pub fn insert_entities_sorted(
        &mut self,
        consumer: ConsumerId,
        ids: &[EntityId],
    ) -> SheetResult<()> {
        self.check_consumer(consumer)?;
        self.sheet.insert_entities_sorted(ids)?;
        self.bump_all();
        Ok(())
    }

    // =========================================================================
    // Intersections
    // =========================================================================

    /// Intersection of two sparse columns, cached for this consumer.
    ///
    /// # Errors
    ///
    /// See [`QueryableSheet::intersection_of`].
    pub fn intersection(
        &mut self,
        consumer: ConsumerId,
        a: ColumnId,
        b: ColumnId,
    ) -> SheetResult<&SparseColumn> {
        self.intersection_of(consumer, &[a, b])
    }

    /// Intersection of any number of sparse columns, cached for this
    /// consumer.
    ///
    /// The cached result is reused when the same columns are requested in
    /// the same order and none of them changed since it was computed.
    /// Otherwise it is recomputed and replaces the cache.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] for an unknown consumer, and
    /// [`SheetError::MissingColumn`] / [`SheetError::WrongKind`] if a column
    /// is not a sparse set. The cache is kept on error.
    pub fn intersection_of(
        &mut self,
        consumer: ConsumerId,
        columns: &[ColumnId],
    ) -> SheetResult<&SparseColumn> {
        self.check_consumer(consumer)?;
        let sets = columns
            .iter()
            .map(|&id| self.sheet.sparse_set(id))
            .collect::<SheetResult<Vec<_>>>()?;
        let versions: Vec<u64> = columns.iter().map(|id| self.versions[id.index()]).collect();

        let memory = &mut self.consumers[consumer.index()];
        let cached = match memory.cache.take() {
            Some(cached) if cached.is_fresh(columns, &versions) => {
                memory.stats.hits += 1;
                tracing::trace!(%consumer, ?columns, "intersection cache hit");
                cached
            }
            _ => {
                memory.stats.recomputes += 1;
                let set = intersection_of(&sets);
                tracing::debug!(%consumer, ?columns, members = set.len(), "intersection recomputed");
                CachedIntersection {
                    key: columns.to_vec(),
                    versions,
                    set,
                }
            }
        };
        Ok(&memory.cache.insert(cached).set)
    }

    /// Cache counters of one consumer.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] for an unknown consumer.
    pub fn cache_stats(&self, consumer: ConsumerId) -> SheetResult<CacheStats> {
        self.check_consumer(consumer)?;
        Ok(self.consumers[consumer.index()].stats)
    }

    fn check_consumer(&self, consumer: ConsumerId) -> SheetResult<()> {
        if consumer.index() < self.consumers.len() {
            Ok(())
        } else {
            self.sheet.config().check_policy.fail(SheetError::Bounds {
                what: "consumer",
                index: consumer.index(),
                limit: self.consumers.len(),
            })
        }
    }

    fn bump_columns(&mut self) {
        for version in &mut self.versions {
            *version += 1;
        }
    }

    fn bump_all(&mut self) {
        self.bump_columns();
        self.size_version += 1;
    }
}
