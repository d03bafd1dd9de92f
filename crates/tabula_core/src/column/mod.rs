//! # Columns
//!
//! A sheet is one wide table. Every column is indexed by the same entity
//! ids, but stores them in one of three shapes:
//!
//! ```text
//! Filled:          [v0, v1, v2, v3, v4, ...]          one slot per entity
//! Sparse:          dense  [3, 1]    sparse [_, 1, _, 0, _]
//! SparseWithData:  dense  [3, 1]    data   [d3, d1]   payload follows dense
//! ```
//!
//! Ids are plain integers with no generation counter. An id is only as
//! valid as the sheet's current entity count.

mod filled;
mod intersect;
mod sparse;
mod sparse_data;
mod type_info;

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{CheckPolicy, SheetError, SheetResult};

pub use filled::FilledColumn;
pub use intersect::{intersection, intersection_of};
pub use sparse::SparseColumn;
pub use sparse_data::SparseColumnWithData;
pub use type_info::{CellsDisplay, Element, ElementType, TypeInfo};

/// Row index into the shared entity space of a sheet.
///
/// `EntityId` is also a valid column payload: a column of entity ids is how
/// one entity refers to another.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable, Serialize,
    Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an entity id from its raw row index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the row index as a `usize` for slot addressing.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl From<u32> for EntityId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies a logical component slot within a sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(u16);

impl ColumnId {
    /// Creates a column id.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns the slot index in the sheet's column array.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u16> for ColumnId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage shape of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// One slot per entity id, always present.
    Filled,
    /// Membership set without payload.
    Sparse,
    /// Membership set with a payload aligned to dense position.
    SparseWithData,
}

impl ColumnKind {
    /// Whether columns of this kind carry an element payload.
    #[must_use]
    pub const fn has_payload(self) -> bool {
        !matches!(self, Self::Sparse)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Filled => "filled",
            Self::Sparse => "sparse",
            Self::SparseWithData => "sparse_with_data",
        })
    }
}

/// Doubling-or-exact-fit growth.
///
/// Returns `None` when `len + additional` already fits in `capacity`,
/// otherwise the new capacity: twice the old one, or exactly what is needed
/// if that is larger.
#[inline]
#[must_use]
pub fn grown_capacity(capacity: usize, len: usize, additional: usize) -> Option<usize> {
    let needed = len + additional;
    (needed > capacity).then(|| needed.max(capacity * 2))
}

/// Checks that `ids` is strictly ascending and every id is below `limit`.
pub(crate) fn validate_sorted(ids: &[EntityId], limit: usize) -> SheetResult<()> {
    for (position, pair) in ids.windows(2).enumerate() {
        if pair[0] >= pair[1] {
            return Err(SheetError::Unsorted {
                position: position + 1,
            });
        }
    }
    match ids.last() {
        Some(last) if last.index() >= limit => Err(SheetError::Bounds {
            what: "entity",
            index: last.index(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// A column of any kind.
#[derive(Clone, Debug)]
pub enum Column {
    /// Dense column.
    Filled(FilledColumn),
    /// Payload-free sparse set.
    Sparse(SparseColumn),
    /// Sparse set with payload.
    SparseWithData(SparseColumnWithData),
}

impl Column {
    /// Creates an empty column of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::Config`] if a payload-carrying kind is created
    /// without an element type.
    pub fn new(kind: ColumnKind, info: Option<TypeInfo>, policy: CheckPolicy) -> SheetResult<Self> {
        match (kind, info) {
            (ColumnKind::Sparse, _) => Ok(Self::Sparse(SparseColumn::with_policy(policy))),
            (ColumnKind::Filled, Some(info)) => Ok(Self::Filled(FilledColumn::new(info, policy))),
            (ColumnKind::SparseWithData, Some(info)) => Ok(Self::SparseWithData(
                SparseColumnWithData::new(info, policy),
            )),
            (kind, None) => Err(SheetError::Config(format!(
                "{kind} columns need an element type"
            ))),
        }
    }

    /// Returns the storage shape.
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        match self {
            Self::Filled(_) => ColumnKind::Filled,
            Self::Sparse(_) => ColumnKind::Sparse,
            Self::SparseWithData(_) => ColumnKind::SparseWithData,
        }
    }

    /// Element descriptor, if the column carries a payload.
    #[must_use]
    pub const fn type_info(&self) -> Option<&TypeInfo> {
        match self {
            Self::Filled(c) => Some(c.type_info()),
            Self::Sparse(_) => None,
            Self::SparseWithData(c) => Some(c.type_info()),
        }
    }

    /// Number of entity rows this column currently covers.
    #[must_use]
    pub fn n_entities(&self) -> usize {
        match self {
            Self::Filled(c) => c.len(),
            Self::Sparse(c) => c.n_entities(),
            Self::SparseWithData(c) => c.n_entities(),
        }
    }

    /// Allocated entity slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match self {
            Self::Filled(c) => c.capacity(),
            Self::Sparse(c) => c.capacity(),
            Self::SparseWithData(c) => c.capacity(),
        }
    }

    /// Membership test. Filled columns contain every entity.
    #[must_use]
    pub fn has_component(&self, id: EntityId) -> bool {
        match self {
            Self::Filled(_) => true,
            Self::Sparse(c) => c.has_component(id),
            Self::SparseWithData(c) => c.has_component(id),
        }
    }

    /// Membership view, for either sparse kind.
    #[must_use]
    pub const fn as_sparse_set(&self) -> Option<&SparseColumn> {
        match self {
            Self::Filled(_) => None,
            Self::Sparse(c) => Some(c),
            Self::SparseWithData(c) => Some(c.as_set()),
        }
    }

    /// Returns the dense column, if this is one.
    #[must_use]
    pub const fn as_filled(&self) -> Option<&FilledColumn> {
        match self {
            Self::Filled(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable dense column, if this is one.
    pub fn as_filled_mut(&mut self) -> Option<&mut FilledColumn> {
        match self {
            Self::Filled(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the payload-free sparse column, if this is one.
    #[must_use]
    pub const fn as_sparse(&self) -> Option<&SparseColumn> {
        match self {
            Self::Sparse(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable payload-free sparse column, if this is one.
    pub fn as_sparse_mut(&mut self) -> Option<&mut SparseColumn> {
        match self {
            Self::Sparse(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the sparse column with payload, if this is one.
    #[must_use]
    pub const fn as_sparse_with_data(&self) -> Option<&SparseColumnWithData> {
        match self {
            Self::SparseWithData(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable sparse column with payload, if this is one.
    pub fn as_sparse_with_data_mut(&mut self) -> Option<&mut SparseColumnWithData> {
        match self {
            Self::SparseWithData(c) => Some(c),
            _ => None,
        }
    }

    /// Grows the entity count by `n`, reallocating if needed.
    pub fn push_entities(&mut self, n: usize) {
        match self {
            Self::Filled(c) => c.push_entities(n),
            Self::Sparse(c) => c.push_entities(n),
            Self::SparseWithData(c) => c.push_entities(n),
        }
    }

    /// Reserves room for `n` more entities without adding them.
    pub fn pre_push(&mut self, n: usize) {
        match self {
            Self::Filled(c) => c.pre_push(n),
            Self::Sparse(c) => c.pre_push(n),
            Self::SparseWithData(c) => c.pre_push(n),
        }
    }

    /// Removes the `n` most recently added entities.
    ///
    /// # Errors
    ///
    /// [`SheetError::Bounds`] if fewer than `n` entities exist.
    pub fn pop_entities(&mut self, n: usize) -> SheetResult<()> {
        match self {
            Self::Filled(c) => c.pop_entities(n),
            Self::Sparse(c) => c.pop_entities(n),
            Self::SparseWithData(c) => c.pop_entities(n),
        }
    }

    /// Drops all rows, keeping capacity.
    pub fn clear(&mut self) {
        match self {
            Self::Filled(c) => c.clear(),
            Self::Sparse(c) => c.clear(),
            Self::SparseWithData(c) => c.clear(),
        }
    }

    /// Whether [`Column::extract_sorted`] can run on this column.
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsupported`] for filled entity-reference columns.
    pub fn check_extract(&self) -> SheetResult<()> {
        match self {
            Self::Filled(c) => c.check_extract(),
            Self::Sparse(_) | Self::SparseWithData(_) => Ok(()),
        }
    }

    /// Whether [`Column::insert_sorted`] can run on this column.
    ///
    /// # Errors
    ///
    /// [`SheetError::Unsupported`] for sparse columns and entity-reference
    /// columns.
    pub fn check_insert(&self) -> SheetResult<()> {
        match self {
            Self::Filled(c) => c.check_insert(),
            Self::Sparse(_) | Self::SparseWithData(_) => Err(SheetError::Unsupported {
                operation: "insert_sorted",
                reason: "sparse sets cannot be renumbered by insertion",
            }),
        }
    }

    /// Removes the listed entities, compacting the column.
    ///
    /// # Errors
    ///
    /// See [`FilledColumn::extract_sorted`] and
    /// [`SparseColumn::extract_sorted`].
    pub fn extract_sorted(&mut self, garbage: &[EntityId]) -> SheetResult<()> {
        match self {
            Self::Filled(c) => c.extract_sorted(garbage),
            Self::Sparse(c) => c.extract_sorted(garbage),
            Self::SparseWithData(c) => c.extract_sorted(garbage),
        }
    }

    /// Inserts default rows at the listed positions.
    ///
    /// # Errors
    ///
    /// See [`Column::check_insert`] and [`FilledColumn::insert_sorted`].
    pub fn insert_sorted(&mut self, ids: &[EntityId]) -> SheetResult<()> {
        match self {
            Self::Filled(c) => c.insert_sorted(ids),
            Self::Sparse(c) => c.insert_sorted(ids),
            Self::SparseWithData(c) => c.insert_sorted(ids),
        }
    }

    /// Heap bytes held by the column.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Self::Filled(c) => c.size_in_bytes(),
            Self::Sparse(c) => c.size_in_bytes(),
            Self::SparseWithData(c) => c.size_in_bytes(),
        }
    }

    /// Raw copy of `source`, which must have the same kind and layout.
    pub(crate) fn copy_from(&mut self, source: &Self) {
        match (self, source) {
            (Self::Filled(dest), Self::Filled(src)) => dest.copy_from(src),
            (Self::Sparse(dest), Self::Sparse(src)) => dest.copy_from(src),
            (Self::SparseWithData(dest), Self::SparseWithData(src)) => dest.copy_from(src),
            (dest, src) => {
                tracing::error!(
                    dest = %dest.kind(),
                    source = %src.kind(),
                    "raw copy between different column kinds skipped"
                );
            }
        }
    }

    /// Byte-level equality of two columns of the same kind.
    pub(crate) fn content_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Filled(a), Self::Filled(b)) => a.content_eq(b),
            (Self::Sparse(a), Self::Sparse(b)) => a.content_eq(b),
            (Self::SparseWithData(a), Self::SparseWithData(b)) => a.content_eq(b),
            _ => false,
        }
    }
}
