//! # Tabula Core
//!
//! Wide-table entity/component storage:
//! - One "spreadsheet" of typed columns over a shared entity row space
//! - Dense (filled) columns and sparse-set columns, with or without payload
//! - Sparse-set intersection for multi-component queries
//! - Per-consumer change tracking and intersection caching
//!
//! ## Architecture Rules
//!
//! 1. **The sheet owns the entity count** - Every column grows and shrinks in lockstep
//! 2. **Data-oriented design** - Payloads live in contiguous, aligned buffers
//! 3. **Phases, not locks** - One writer mutates, then many readers fan out
//!
//! ## Example
//!
//! ```rust,ignore
//! use tabula_core::{ColumnId, QueryableSheet, Sheet, ConsumerId};
//!
//! let mut sheet = Sheet::new(16);
//! sheet.add_filled_column::<[f32; 3]>(ColumnId::new(0))?;
//! sheet.add_sparse_column(ColumnId::new(1))?;
//! sheet.add_entities(1_000)?;
//!
//! let mut query = QueryableSheet::new(sheet, 4);
//! let (_, changed) = query.read_changed(ConsumerId::new(0), ColumnId::new(0))?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod column;
pub mod error;
pub mod memory;
pub mod query;
pub mod sheet;
pub mod sync;

pub use column::{
    intersection, intersection_of, CellsDisplay, Column, ColumnId, ColumnKind, Element,
    ElementType, EntityId, FilledColumn, SparseColumn, SparseColumnWithData, TypeInfo,
};
pub use error::{CheckPolicy, SheetError, SheetResult};
pub use memory::ColumnBuffer;
pub use query::{CacheStats, ConsumerId, QueryableSheet};
pub use sheet::{ColumnSchema, Sheet, SheetConfig, SheetSchema};
pub use sync::PhasedSheet;
