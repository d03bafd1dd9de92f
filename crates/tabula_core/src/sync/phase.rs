//! # Phased Sheet
//!
//! Fork-join driver over a [`QueryableSheet`].
//!
//! ## Thread Safety
//!
//! - `mutate`: exclusive access (write lock), one caller at a time
//! - `fan_out`: shared access (read lock) split across the rayon pool; it
//!   returns only after every task has finished
//! - `for_each_chunk_mut`: exclusive access, with one column split into
//!   disjoint chunks written in parallel

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::column::{ColumnId, Element};
use crate::error::SheetResult;
use crate::query::{ConsumerId, QueryableSheet};

/// A [`QueryableSheet`] shared between a mutation phase and parallel read
/// phases.
///
/// ## Usage
///
/// ```rust,ignore
/// let phased = PhasedSheet::new(QueryableSheet::new(sheet, 1));
///
/// loop {
///     // Mutation phase
///     phased.mutate(|q| q.add_entities(SPAWNER, 100))?;
///
///     // Read phase, joined before returning
///     let sums = phased.fan_out_reduce(n, 1024, |range, q| {
///         q.read_array::<f32>(HEAT).map(|h| h[range].iter().sum::<f32>())
///     });
/// }
/// ```
pub struct PhasedSheet {
    /// The shared sheet.
    inner: RwLock<QueryableSheet>,
    /// Number of completed exclusive phases.
    epoch: AtomicU64,
}

impl PhasedSheet {
    /// Wraps a sheet for phased access.
    #[must_use]
    pub fn new(query: QueryableSheet) -> Self {
        Self {
            inner: RwLock::new(query),
            epoch: AtomicU64::new(0),
        }
    }

    /// Number of exclusive phases completed so far.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Runs a mutation phase with exclusive access.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut QueryableSheet) -> R) -> R {
        let mut guard = self.inner.write();
        let result = f(&mut guard);
        self.finish_phase();
        result
    }

    /// Runs `f` with shared access on the calling thread.
    pub fn read<R>(&self, f: impl FnOnce(&QueryableSheet) -> R) -> R {
        f(&self.inner.read())
    }

    /// Splits `0..len` into ranges of `chunk` rows and runs `f` on each in
    /// parallel, with shared access to the sheet.
    ///
    /// No mutation can start until every task has returned.
    pub fn fan_out<F>(&self, len: usize, chunk: usize, f: F)
    where
        F: Fn(Range<usize>, &QueryableSheet) + Sync,
    {
        let guard = self.inner.read();
        let query: &QueryableSheet = &guard;
        chunk_ranges(len, chunk)
            .into_par_iter()
            .for_each(|range| f(range, query));
    }

    /// Like [`PhasedSheet::fan_out`], collecting one result per range in
    /// range order.
    pub fn fan_out_reduce<R, F>(&self, len: usize, chunk: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(Range<usize>, &QueryableSheet) -> R + Sync,
    {
        let guard = self.inner.read();
        let query: &QueryableSheet = &guard;
        chunk_ranges(len, chunk)
            .into_par_iter()
            .map(|range| f(range, query))
            .collect()
    }

    /// Writes one dense column in parallel, `chunk` rows per task.
    ///
    /// `f` receives the id of the first row of its chunk and the chunk
    /// itself. The column's version is bumped once for the whole pass.
    ///
    /// # Errors
    ///
    /// See [`QueryableSheet::write_array`]. Nothing runs on error.
    pub fn for_each_chunk_mut<T, F>(
        &self,
        consumer: ConsumerId,
        column: ColumnId,
        chunk: usize,
        f: F,
    ) -> SheetResult<()>
    where
        T: Element,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let chunk = chunk.max(1);
        let mut guard = self.inner.write();
        let n_entities = guard.sheet().n_entities();
        let rows = guard.write_array::<T>(consumer, column)?;
        rows[..n_entities]
            .par_chunks_mut(chunk)
            .enumerate()
            .for_each(|(i, rows)| f(i * chunk, rows));
        self.finish_phase();
        Ok(())
    }

    /// Unwraps the sheet.
    #[must_use]
    pub fn into_inner(self) -> QueryableSheet {
        self.inner.into_inner()
    }

    fn finish_phase(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(epoch, "phase finished");
    }
}

/// `0..len` cut into consecutive ranges of at most `chunk` items.
fn chunk_ranges(len: usize, chunk: usize) -> Vec<Range<usize>> {
    let chunk = chunk.max(1);
    (0..len)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(len))
        .collect()
}
