//! # Sheet
//!
//! The central container: one wide table of columns over a shared entity
//! row space.
//!
//! The sheet is the single source of truth for the entity count. Every
//! entity operation is broadcast to every registered column, so every
//! column always covers exactly `n_entities` rows (and may have room for
//! more).
//!
//! ```text
//!             col #0 (filled)   col #1 (sparse)   col #4 (sparse+data)
//! entity 0    v0                .                 .
//! entity 1    v1                x                 d1
//! entity 2    v2                .                 .
//! ```

mod compare;
mod schema;

use std::collections::BTreeSet;

use crate::column::{
    validate_sorted, Column, ColumnId, ColumnKind, Element, EntityId, FilledColumn, SparseColumn,
    SparseColumnWithData, TypeInfo,
};
use crate::error::{SheetError, SheetResult};

pub use compare::{copy, copy_into, equals};
pub use schema::{ColumnSchema, SheetConfig, SheetSchema};

/// Column registry and entity lifecycle.
///
/// # Example
///
/// ```rust,ignore
/// let mut sheet = Sheet::new(8);
/// sheet.add_filled_column::<f32>(ColumnId::new(0))?;
/// sheet.add_sparse_column(ColumnId::new(1))?;
///
/// let first = sheet.add_entities(3)?;
/// sheet.get_array_mut::<f32>(ColumnId::new(0))?[first.index()] = 1.0;
/// sheet.sparse_mut(ColumnId::new(1))?.add_component(first)?;
/// ```
#[derive(Clone, Debug)]
pub struct Sheet {
    /// Column slots, indexed by `ColumnId`.
    columns: Vec<Option<Column>>,
    /// Optional display names, indexed by `ColumnId`.
    names: Vec<Option<String>>,
    /// Registered ids, ascending.
    active: BTreeSet<ColumnId>,
    /// Shared entity count.
    n_entities: usize,
    /// Settings.
    config: SheetConfig,
}

impl Sheet {
    /// Upper bound on the entity count. Every id stays below it.
    pub const MAX_ENTITIES: usize = u32::MAX as usize;

    /// Creates an empty sheet with `column_capacity` column slots.
    #[must_use]
    pub fn new(column_capacity: usize) -> Self {
        Self::with_config(SheetConfig {
            column_capacity,
            ..SheetConfig::default()
        })
    }

    /// Creates an empty sheet from explicit settings.
    #[must_use]
    pub fn with_config(config: SheetConfig) -> Self {
        let slots = config.column_capacity;
        Self {
            columns: (0..slots).map(|_| None).collect(),
            names: vec![None; slots],
            active: BTreeSet::new(),
            n_entities: 0,
            config,
        }
    }

    /// Creates a sheet with every column the schema declares.
    ///
    /// # Errors
    ///
    /// [`SheetError::Config`] if the schema does not validate.
    pub fn from_schema(schema: &SheetSchema) -> SheetResult<Self> {
        schema.validate()?;
        let mut sheet = Self::with_config(SheetConfig {
            column_capacity: schema.column_capacity(),
            ..schema.config
        });
        for column in &schema.columns {
            sheet.add_column(column.id, column.kind, column.type_info())?;
            sheet.names[column.id.index()].clone_from(&column.name);
        }
        tracing::info!(
            columns = sheet.n_columns(),
            column_capacity = sheet.column_capacity(),
            "sheet created from schema"
        );
        Ok(sheet)
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// Registers a column.
    ///
    /// The new column starts at the configured minimum capacity and is then
    /// sized to the current entity count. Registering an id twice with the
    /// same kind returns the existing column.
    ///
    /// # Errors
    ///
    /// - [`SheetError::Bounds`] if `id` is past the column capacity
    /// - [`SheetError::WrongKind`] if `id` is registered with another kind
    /// - [`SheetError::Config`] if a payload kind has no `info`
    pub fn add_column(
        &mut self,
        id: ColumnId,
        kind: ColumnKind,
        info: Option<TypeInfo>,
    ) -> SheetResult<&mut Column> {
        let policy = self.config.check_policy;
        let index = id.index();
        let limit = self.columns.len();
        let Some(slot) = self.columns.get_mut(index) else {
            return policy.fail(SheetError::Bounds {
                what: "column",
                index,
                limit,
            });
        };

        if let Some(existing) = slot.as_ref() {
            if existing.kind() != kind {
                return policy.fail(SheetError::WrongKind {
                    column: id,
                    expected: kind,
                    found: existing.kind(),
                });
            }
            tracing::debug!(column = %id, "column already registered");
        } else {
            let mut column = Column::new(kind, info, policy).map_err(|e| policy.report(e))?;
            column.pre_push(self.config.min_column_capacity);
            column.push_entities(self.n_entities);
            *slot = Some(column);
            self.active.insert(id);
            tracing::debug!(column = %id, %kind, "column registered");
        }
        self.column_mut(id)
    }

    /// Registers a dense column of `T`.
    ///
    /// # Errors
    ///
    /// Same as [`Sheet::add_column`].
    pub fn add_filled_column<T: Element>(&mut self, id: ColumnId) -> SheetResult<&mut FilledColumn> {
        self.add_column(id, ColumnKind::Filled, Some(TypeInfo::of::<T>()))?;
        self.filled_mut(id)
    }

    /// Registers a payload-free sparse column.
    ///
    /// # Errors
    ///
    /// Same as [`Sheet::add_column`].
    pub fn add_sparse_column(&mut self, id: ColumnId) -> SheetResult<&mut SparseColumn> {
        self.add_column(id, ColumnKind::Sparse, None)?;
        self.sparse_mut(id)
    }

    /// Registers a sparse column carrying `T`.
    ///
    /// # Errors
    ///
    /// Same as [`Sheet::add_column`].
    pub fn add_sparse_column_with_data<T: Element>(
        &mut self,
        id: ColumnId,
    ) -> SheetResult<&mut SparseColumnWithData> {
        self.add_column(id, ColumnKind::SparseWithData, Some(TypeInfo::of::<T>()))?;
        self.sparse_with_data_mut(id)
    }

    /// Unregisters a column, handing it back.
    pub fn remove_column(&mut self, id: ColumnId) -> Option<Column> {
        let column = self.columns.get_mut(id.index())?.take()?;
        self.active.remove(&id);
        self.names[id.index()] = None;
        tracing::debug!(column = %id, "column removed");
        Some(column)
    }

    /// Looks up a column without reporting anything.
    #[must_use]
    pub fn try_column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(id.index()).and_then(Option::as_ref)
    }

    /// Looks up a column.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] if nothing is registered at `id`.
    pub fn column(&self, id: ColumnId) -> SheetResult<&Column> {
        match self.try_column(id) {
            Some(column) => Ok(column),
            None => self.config.check_policy.fail(SheetError::MissingColumn(id)),
        }
    }

    /// Looks up a column for writing.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] if nothing is registered at `id`.
    pub fn column_mut(&mut self, id: ColumnId) -> SheetResult<&mut Column> {
        let policy = self.config.check_policy;
        match self.columns.get_mut(id.index()).and_then(Option::as_mut) {
            Some(column) => Ok(column),
            None => policy.fail(SheetError::MissingColumn(id)),
        }
    }

    /// The dense column at `id`.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] or [`SheetError::WrongKind`].
    pub fn filled(&self, id: ColumnId) -> SheetResult<&FilledColumn> {
        let policy = self.config.check_policy;
        match self.column(id)? {
            Column::Filled(column) => Ok(column),
            other => Err(policy.report(SheetError::WrongKind {
                column: id,
                expected: ColumnKind::Filled,
                found: other.kind(),
            })),
        }
    }

    /// The dense column at `id`, for writing.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] or [`SheetError::WrongKind`].
    pub fn filled_mut(&mut self, id: ColumnId) -> SheetResult<&mut FilledColumn> {
        let policy = self.config.check_policy;
        match self.column_mut(id)? {
            Column::Filled(column) => Ok(column),
            other => Err(policy.report(SheetError::WrongKind {
                column: id,
                expected: ColumnKind::Filled,
                found: other.kind(),
            })),
        }
    }

    /// The payload-free sparse column at `id`.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] or [`SheetError::WrongKind`].
    pub fn sparse(&self, id: ColumnId) -> SheetResult<&SparseColumn> {
        let policy = self.config.check_policy;
        match self.column(id)? {
            Column::Sparse(column) => Ok(column),
            other => Err(policy.report(SheetError::WrongKind {
                column: id,
                expected: ColumnKind::Sparse,
                found: other.kind(),
            })),
        }
    }

    /// The payload-free sparse column at `id`, for writing.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] or [`SheetError::WrongKind`].
    pub fn sparse_mut(&mut self, id: ColumnId) -> SheetResult<&mut SparseColumn> {
        let policy = self.config.check_policy;
        match self.column_mut(id)? {
            Column::Sparse(column) => Ok(column),
            other => Err(policy.report(SheetError::WrongKind {
                column: id,
                expected: ColumnKind::Sparse,
                found: other.kind(),
            })),
        }
    }

    /// The sparse column with payload at `id`.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] or [`SheetError::WrongKind`].
    pub fn sparse_with_data(&self, id: ColumnId) -> SheetResult<&SparseColumnWithData> {
        let policy = self.config.check_policy;
        match self.column(id)? {
            Column::SparseWithData(column) => Ok(column),
            other => Err(policy.report(SheetError::WrongKind {
                column: id,
                expected: ColumnKind::SparseWithData,
                found: other.kind(),
            })),
        }
    }

    /// The sparse column with payload at `id`, for writing.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`] or [`SheetError::WrongKind`].
    pub fn sparse_with_data_mut(&mut self, id: ColumnId) -> SheetResult<&mut SparseColumnWithData> {
        let policy = self.config.check_policy;
        match self.column_mut(id)? {
            Column::SparseWithData(column) => Ok(column),
            other => Err(policy.report(SheetError::WrongKind {
                column: id,
                expected: ColumnKind::SparseWithData,
                found: other.kind(),
            })),
        }
    }

    /// Membership view of a sparse column of either kind.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`], or [`SheetError::WrongKind`] for a
    /// filled column.
    pub fn sparse_set(&self, id: ColumnId) -> SheetResult<&SparseColumn> {
        let column = self.column(id)?;
        column.as_sparse_set().ok_or_else(|| {
            self.config.check_policy.report(SheetError::WrongKind {
                column: id,
                expected: ColumnKind::Sparse,
                found: column.kind(),
            })
        })
    }

    /// Typed view of a dense column's live rows.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`], [`SheetError::WrongKind`] or
    /// [`SheetError::TypeMismatch`].
    pub fn get_array<T: Element>(&self, id: ColumnId) -> SheetResult<&[T]> {
        self.filled(id)?.as_slice()
    }

    /// Typed mutable view of a dense column, reserved rows included.
    ///
    /// # Errors
    ///
    /// [`SheetError::MissingColumn`], [`SheetError::WrongKind`] or
    /// [`SheetError::TypeMismatch`].
    pub fn get_array_mut<T: Element>(&mut self, id: ColumnId) -> SheetResult<&mut [T]> {
        self.filled_mut(id)?.as_mut_slice()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Appends `n` entities to every column.
    ///
    /// # Returns
    ///
    /// The id of the first new entity. The new ids are contiguous.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] if the count would pass
    /// [`Sheet::MAX_ENTITIES`]. No column is touched on error.
    pub fn add_entities(&mut self, n: usize) -> SheetResult<EntityId> {
        self.check_growth(n)?;
        let first = EntityId::from_index(self.n_entities);
        for column in self.columns.iter_mut().flatten() {
            column.push_entities(n);
        }
        self.n_entities += n;
        tracing::trace!(added = n, total = self.n_entities, "entities added");
        Ok(first)
    }

    /// Reserves room for `n` more entities in every column.
    pub fn pre_add_entities(&mut self, n: usize) {
        for column in self.columns.iter_mut().flatten() {
            column.pre_push(n);
        }
    }

    /// Removes the `n` most recently added entities.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] if fewer than `n` entities exist. No column is
    /// touched on error.
    pub fn pop_entities(&mut self, n: usize) -> SheetResult<()> {
        if n > self.n_entities {
            return self.config.check_policy.fail(SheetError::Bounds {
                what: "pop count",
                index: n,
                limit: self.n_entities + 1,
            });
        }
        for column in self.columns.iter_mut().flatten() {
            column.pop_entities(n)?;
        }
        self.n_entities -= n;
        tracing::trace!(popped = n, total = self.n_entities, "entities popped");
        Ok(())
    }

    /// Removes the listed entities from every column and renumbers the
    /// survivors downwards.
    ///
    /// # Arguments
    ///
    /// * `garbage` - Strictly ascending ids below `n_entities`
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsorted`] or [`SheetError::Bounds`] for a bad id
    /// list, and [`SheetError::Unsupported`] if any column holds entity
    /// ids. Everything is checked before the first column is touched.
    pub fn extract_entities_sorted(&mut self, garbage: &[EntityId]) -> SheetResult<()> {
        let policy = self.config.check_policy;
        validate_sorted(garbage, self.n_entities).map_err(|e| policy.report(e))?;
        for column in self.columns.iter().flatten() {
            column.check_extract().map_err(|e| policy.report(e))?;
        }
        for column in self.columns.iter_mut().flatten() {
            column.extract_sorted(garbage)?;
        }
        self.n_entities -= garbage.len();
        tracing::debug!(removed = garbage.len(), total = self.n_entities, "entities extracted");
        Ok(())
    }

    /// Inserts default entities at the listed ids in every column, shifting
    /// existing entities upwards.
    ///
    /// # Arguments
    ///
    /// * `ids` - Strictly ascending ids in the numbering after the insert
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsorted`] or [`SheetError::Bounds`] for a bad id
    /// list, and [`SheetError::Unsupported`] if any column is sparse or
    /// holds entity ids. Everything is checked before the first column is
    /// touched.
    pub fn insert_entities_sorted(&mut self, ids: &[EntityId]) -> SheetResult<()> {
        let policy = self.config.check_policy;
        self.check_growth(ids.len())?;
        validate_sorted(ids, self.n_entities + ids.len()).map_err(|e| policy.report(e))?;
        for column in self.columns.iter().flatten() {
            column.check_insert().map_err(|e| policy.report(e))?;
        }
        for column in self.columns.iter_mut().flatten() {
            column.insert_sorted(ids)?;
        }
        self.n_entities += ids.len();
        tracing::debug!(inserted = ids.len(), total = self.n_entities, "entities inserted");
        Ok(())
    }

    /// Rejects growth by `n` that would number an entity past
    /// [`Sheet::MAX_ENTITIES`].
    fn check_growth(&self, n: usize) -> SheetResult<()> {
        match self.n_entities.checked_add(n) {
            Some(total) if total <= Self::MAX_ENTITIES => Ok(()),
            _ => self.config.check_policy.fail(SheetError::Bounds {
                what: "entity",
                index: self.n_entities.saturating_add(n).saturating_sub(1),
                limit: Self::MAX_ENTITIES,
            }),
        }
    }

    /// Removes every column and entity.
    pub fn clear(&mut self) {
        for slot in &mut self.columns {
            *slot = None;
        }
        for name in &mut self.names {
            *name = None;
        }
        self.active.clear();
        self.n_entities = 0;
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Registered column ids, ascending.
    pub fn columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.active.iter().copied()
    }

    /// Number of registered columns.
    #[inline]
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.active.len()
    }

    /// Number of column slots.
    #[inline]
    #[must_use]
    pub fn column_capacity(&self) -> usize {
        self.columns.len()
    }

    /// Shared entity count.
    #[inline]
    #[must_use]
    pub const fn n_entities(&self) -> usize {
        self.n_entities
    }

    /// Display name of a column, if the schema gave it one.
    #[must_use]
    pub fn column_name(&self, id: ColumnId) -> Option<&str> {
        self.names.get(id.index())?.as_deref()
    }

    /// Settings.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Heap bytes held by all columns.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.columns.iter().flatten().map(Column::size_in_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITION: ColumnId = ColumnId::new(0);
    const TAG: ColumnId = ColumnId::new(1);
    const SPEED: ColumnId = ColumnId::new(2);

    fn sheet() -> Sheet {
        let mut sheet = Sheet::new(4);
        sheet.add_filled_column::<f32>(POSITION).unwrap();
        sheet.add_sparse_column(TAG).unwrap();
        sheet.add_sparse_column_with_data::<u16>(SPEED).unwrap();
        sheet
    }

    #[test]
    fn test_add_entities_broadcasts() {
        let mut sheet = sheet();
        assert_eq!(sheet.add_entities(3).unwrap(), EntityId::new(0));
        assert_eq!(sheet.add_entities(2).unwrap(), EntityId::new(3));
        for id in sheet.columns().collect::<Vec<_>>() {
            let column = sheet.column(id).unwrap();
            assert_eq!(column.n_entities(), 5);
            assert!(column.capacity() >= 5);
        }
    }

    #[test]
    fn test_entity_count_limit() {
        // No columns, so only the count moves
        let mut sheet = Sheet::new(1);
        let first = sheet.add_entities(Sheet::MAX_ENTITIES - 1).unwrap();
        assert_eq!(first, EntityId::new(0));
        assert_eq!(sheet.add_entities(1).unwrap(), EntityId::new(u32::MAX - 1));
        assert!(matches!(
            sheet.add_entities(1),
            Err(SheetError::Bounds { what: "entity", .. })
        ));
        assert!(sheet.add_entities(usize::MAX).is_err());
        assert!(sheet.insert_entities_sorted(&[EntityId::new(0)]).is_err());
        assert_eq!(sheet.n_entities(), Sheet::MAX_ENTITIES);
    }

    #[test]
    fn test_late_column_catches_up() {
        let mut sheet = Sheet::new(4);
        sheet.add_entities(10).unwrap();
        sheet.add_filled_column::<u8>(ColumnId::new(3)).unwrap();
        assert_eq!(sheet.get_array::<u8>(ColumnId::new(3)).unwrap().len(), 10);
    }

    #[test]
    fn test_double_registration_returns_existing() {
        let mut sheet = sheet();
        sheet.add_entities(2).unwrap();
        sheet.sparse_mut(TAG).unwrap().add_component(EntityId::new(1)).unwrap();
        let again = sheet.add_sparse_column(TAG).unwrap();
        assert!(again.has_component(EntityId::new(1)));
        assert!(matches!(
            sheet.add_column(TAG, ColumnKind::Filled, Some(TypeInfo::of::<u8>())),
            Err(SheetError::WrongKind { .. })
        ));
        assert_eq!(sheet.n_columns(), 3);
    }

    #[test]
    fn test_column_bounds_and_lookup() {
        let mut sheet = sheet();
        assert!(matches!(
            sheet.add_sparse_column(ColumnId::new(4)),
            Err(SheetError::Bounds { what: "column", .. })
        ));
        assert_eq!(sheet.column(ColumnId::new(3)).err(), Some(SheetError::MissingColumn(ColumnId::new(3))));
        assert!(sheet.try_column(ColumnId::new(99)).is_none());
        assert!(matches!(sheet.filled(TAG), Err(SheetError::WrongKind { .. })));
        // Both sparse kinds expose membership
        assert!(sheet.sparse_set(SPEED).is_ok());
        assert!(sheet.sparse_set(POSITION).is_err());
    }

    #[test]
    fn test_pop_entities() {
        let mut sheet = sheet();
        sheet.add_entities(4).unwrap();
        sheet.sparse_mut(TAG).unwrap().add_component(EntityId::new(3)).unwrap();
        sheet.pop_entities(1).unwrap();
        assert_eq!(sheet.n_entities(), 3);
        assert!(sheet.sparse(TAG).unwrap().is_empty());
        assert!(sheet.pop_entities(4).is_err());
        assert_eq!(sheet.n_entities(), 3);
    }

    #[test]
    fn test_extract_entities() {
        let mut sheet = sheet();
        sheet.add_entities(4).unwrap();
        sheet
            .get_array_mut::<f32>(POSITION)
            .unwrap()[..4]
            .copy_from_slice(&[0.0, 1.0, 2.0, 3.0]);
        sheet.sparse_mut(TAG).unwrap().add_component(EntityId::new(3)).unwrap();
        sheet
            .sparse_with_data_mut(SPEED)
            .unwrap()
            .insert(EntityId::new(2), 20u16)
            .unwrap();

        sheet.extract_entities_sorted(&[EntityId::new(0), EntityId::new(2)]).unwrap();
        assert_eq!(sheet.n_entities(), 2);
        assert_eq!(sheet.get_array::<f32>(POSITION).unwrap(), &[1.0, 3.0]);
        assert!(sheet.sparse(TAG).unwrap().has_component(EntityId::new(1)));
        assert!(sheet.sparse_with_data(SPEED).unwrap().is_empty());
    }

    #[test]
    fn test_rejected_broadcast_leaves_sheet_intact() {
        let mut sheet = sheet();
        sheet.add_filled_column::<EntityId>(ColumnId::new(3)).unwrap();
        sheet.add_entities(3).unwrap();
        assert!(matches!(
            sheet.extract_entities_sorted(&[EntityId::new(1)]),
            Err(SheetError::Unsupported { .. })
        ));
        assert_eq!(sheet.n_entities(), 3);
        assert_eq!(sheet.get_array::<f32>(POSITION).unwrap().len(), 3);
        // Sparse columns block insertion
        assert!(sheet.insert_entities_sorted(&[EntityId::new(0)]).is_err());
        assert_eq!(sheet.n_entities(), 3);
    }

    #[test]
    fn test_insert_entities_with_only_filled_columns() {
        let mut sheet = Sheet::new(1);
        sheet.add_filled_column::<i32>(POSITION).unwrap();
        sheet.add_entities(2).unwrap();
        sheet.get_array_mut::<i32>(POSITION).unwrap()[..2].copy_from_slice(&[5, 6]);
        sheet.insert_entities_sorted(&[EntityId::new(1)]).unwrap();
        assert_eq!(sheet.get_array::<i32>(POSITION).unwrap(), &[5, 0, 6]);
        sheet.extract_entities_sorted(&[EntityId::new(1)]).unwrap();
        assert_eq!(sheet.get_array::<i32>(POSITION).unwrap(), &[5, 6]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut sheet = sheet();
        sheet.add_entities(2).unwrap();
        assert!(sheet.remove_column(TAG).is_some());
        assert!(sheet.remove_column(TAG).is_none());
        assert_eq!(sheet.columns().collect::<Vec<_>>(), vec![POSITION, SPEED]);
        assert!(sheet.size_in_bytes() > 0);
        sheet.clear();
        assert_eq!(sheet.n_columns(), 0);
        assert_eq!(sheet.n_entities(), 0);
    }
}
