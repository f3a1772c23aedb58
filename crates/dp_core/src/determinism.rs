//! Determinism utilities: stable ordering & order-independent reduction.
//!
//! This module is **I/O-free**. It provides:
//! - Descending-by-score ordering that keeps insertion order among ties
//! - An order-independent sum over per-voter contributions

use std::collections::BTreeMap;

/* -------------------------------------------------------------------------- */
/*                               Stable Ordering                              */
/* -------------------------------------------------------------------------- */

/// Indices of `items` ordered by descending `score`; ties keep insertion order.
///
/// `sort_by` is a stable sort, so equal scores never swap.
pub fn order_by_score_desc<T, F>(items: &[T], score: F) -> Vec<usize>
where
    F: Fn(&T) -> u64,
{
    let mut idx: Vec<usize> = (0..items.len()).collect();
    idx.sort_by(|&a, &b| score(&items[b]).cmp(&score(&items[a])));
    idx
}

/// Exact reverse of [`order_by_score_desc`]: lowest first, and among ties the
/// later item first.
pub fn order_by_score_asc_reversed_ties<T, F>(items: &[T], score: F) -> Vec<usize>
where
    F: Fn(&T) -> u64,
{
    let mut idx = order_by_score_desc(items, score);
    idx.reverse();
    idx
}

/* -------------------------------------------------------------------------- */
/*                         Deterministic (order-free) reduce                   */
/* -------------------------------------------------------------------------- */

/// Sum keyed contributions into a key-ordered map. Addition is commutative, so
/// the iteration order of `it` cannot change the result.
pub fn sum_by_key<K: Ord, I: IntoIterator<Item = (K, u64)>>(it: I) -> BTreeMap<K, u64> {
    let mut out = BTreeMap::new();
    for (k, v) in it {
        *out.entry(k).or_insert(0u64) += v;
    }
    out
}

/* ---------------------------------- Tests --------------------------------- */
