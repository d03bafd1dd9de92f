//! # Memory Management
//!
//! Raw row storage shared by every payload-carrying column.
//!
//! ## Design
//!
//! Columns are allocated up front and only reallocate on structural calls
//! (`push_entities`, `pre_push`, insertion, extraction). Between those calls:
//! - No heap allocations
//! - Stable slices for the whole phase
//! - Rows stay contiguous and cache-friendly

mod buffer;

pub use buffer::ColumnBuffer;
