//! # Sheet Error Types
//!
//! Every condition the storage engine can detect. None of them is transient:
//! a returned error always means the caller broke a contract, and the sheet
//! was left exactly as it was before the call.
//!
//! ## Severity
//!
//! - **Soft** errors (bounds, duplicate component, capacity, type and kind
//!   mismatches) are reported at `warn` level and returned.
//! - **Fatal** errors (schema mismatch, unsupported operation, bad config)
//!   are reported at `error` level and returned; the operation never ran.
//!
//! Under [`CheckPolicy::Strict`] every error panics instead of returning.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::column::{ColumnId, ColumnKind, EntityId};

/// Errors that can occur while operating on a sheet or one of its columns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// An entity id, column id or count was outside the valid range.
    #[error("{what} index {index} out of bounds (limit {limit})")]
    Bounds {
        /// What was being indexed.
        what: &'static str,
        /// The offending index.
        index: usize,
        /// The exclusive upper bound that was violated.
        limit: usize,
    },

    /// `add_component` on an entity that already has the component.
    #[error("entity {entity} already has this component")]
    DuplicateComponent {
        /// The entity that was added twice.
        entity: EntityId,
    },

    /// Payload access on an entity that does not have the component.
    #[error("entity {entity} does not have this component")]
    MissingComponent {
        /// The entity that was looked up.
        entity: EntityId,
    },

    /// A bulk id list was not strictly ascending.
    #[error("id list not strictly ascending at position {position}")]
    Unsorted {
        /// Index of the first out-of-order id.
        position: usize,
    },

    /// A structural write would run past the allocated capacity.
    #[error("capacity exceeded: need {needed}, have {capacity}")]
    CapacityExceeded {
        /// Slots required by the write.
        needed: usize,
        /// Slots currently allocated.
        capacity: usize,
    },

    /// Typed access with a type whose layout differs from the column's.
    #[error("type mismatch: column stores {expected}, accessed as {found}")]
    TypeMismatch {
        /// Name of the column's element type.
        expected: &'static str,
        /// Name of the requested type.
        found: &'static str,
    },

    /// No column is registered under this id.
    #[error("no column registered at {0}")]
    MissingColumn(ColumnId),

    /// The column exists but has a different storage shape.
    #[error("column {column} is {found}, not {expected}")]
    WrongKind {
        /// The column that was requested.
        column: ColumnId,
        /// The kind the caller asked for.
        expected: ColumnKind,
        /// The kind actually registered.
        found: ColumnKind,
    },

    /// Two sheets do not have the same column layout.
    #[error("schema mismatch: source has {source_columns} column slots, destination {dest_columns}")]
    SchemaMismatch {
        /// Column capacity of the source sheet.
        source_columns: usize,
        /// Column capacity of the destination sheet.
        dest_columns: usize,
    },

    /// The operation is not implemented for this column/type combination.
    #[error("unsupported operation {operation}: {reason}")]
    Unsupported {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Why it cannot run.
        reason: &'static str,
    },

    /// Invalid schema or configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SheetError {
    /// Whether this error is always a hard stop, regardless of policy.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. } | Self::Unsupported { .. } | Self::Config(_)
        )
    }
}

/// Result type for sheet operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// How detected errors are surfaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPolicy {
    /// Log the error and return it; the operation becomes a no-op.
    #[default]
    Report,
    /// Checked configuration: any error panics at the point of detection.
    Strict,
}

impl CheckPolicy {
    /// Logs `error` and hands it back for the caller to return.
    ///
    /// # Panics
    ///
    /// Panics under [`CheckPolicy::Strict`].
    #[track_caller]
    pub fn report(self, error: SheetError) -> SheetError {
        if error.is_fatal() {
            tracing::error!(%error, "sheet operation rejected");
        } else {
            tracing::warn!(%error, "sheet validation failed");
        }
        if self == Self::Strict {
            panic!("{error}");
        }
        error
    }

    /// Shorthand for `Err(self.report(error))`.
    ///
    /// # Errors
    ///
    /// Always returns the reported error.
    #[track_caller]
    pub fn fail<T>(self, error: SheetError) -> SheetResult<T> {
        Err(self.report(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        let soft = SheetError::DuplicateComponent {
            entity: EntityId::new(3),
        };
        let fatal = SheetError::Unsupported {
            operation: "insert_sorted",
            reason: "sparse",
        };
        assert!(!soft.is_fatal());
        assert!(fatal.is_fatal());
    }

    #[test]
    fn test_report_returns_error() {
        let err = SheetError::Bounds {
            what: "entity",
            index: 9,
            limit: 4,
        };
        assert_eq!(CheckPolicy::Report.report(err.clone()), err);
        assert_eq!(err.to_string(), "entity index 9 out of bounds (limit 4)");
    }

    #[test]
    #[should_panic(expected = "already has this component")]
    fn test_strict_panics() {
        let _ = CheckPolicy::Strict.report(SheetError::DuplicateComponent {
            entity: EntityId::new(1),
        });
    }
}
