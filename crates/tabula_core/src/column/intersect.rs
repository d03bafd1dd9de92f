//! # Sparse-Set Intersection
//!
//! Scan the smaller set's dense array and keep the ids the larger set
//! contains. Cost is `O(min(|a|, |b|))` membership tests.
//!
//! Result order follows the scanned set, so it depends on which input was
//! smaller. Callers must not rely on it.

use super::sparse::SparseColumn;

/// Intersects two sets.
///
/// The result can address every id either input can, and covers the larger
/// of the two entity counts.
#[must_use]
pub fn intersection(a: &SparseColumn, b: &SparseColumn) -> SparseColumn {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut result = SparseColumn::sized(
        a.capacity().max(b.capacity()),
        a.n_entities().max(b.n_entities()),
        a.policy(),
    );
    for id in small.iter().filter(|&id| large.has_component(id)) {
        result.push_member(id);
    }
    result
}

/// Intersects any number of sets.
///
/// - no sets: an empty set
/// - one set: a copy of it
/// - four sets: `(a ∩ b) ∩ (c ∩ d)`
/// - otherwise: pairwise, left to right
#[must_use]
pub fn intersection_of(sets: &[&SparseColumn]) -> SparseColumn {
    match sets {
        [] => SparseColumn::new(),
        [only] => (*only).clone(),
        [a, b, c, d] => intersection(&intersection(a, b), &intersection(c, d)),
        [a, b, rest @ ..] => rest
            .iter()
            .fold(intersection(a, b), |acc, next| intersection(&acc, next)),
    }
}
