//! Top-N selection by congestion metric
//!
//! Ranking is a total order so results are reproducible:
//!
//! 1. `metric` descending
//! 2. `timestamp` ascending (earliest reading wins a tie)
//! 3. `source_id` ascending

use std::cmp::Ordering;

use crate::types::Record;

/// Total ranking order for window results
///
/// `Ordering::Less` means `a` ranks ahead of `b`.
pub fn congestion_order(a: &Record, b: &Record) -> Ordering {
    b.metric
        .cmp(&a.metric)
        .then_with(|| a.timestamp.cmp(&b.timestamp))
        .then_with(|| a.source_id.cmp(&b.source_id))
}

/// Keep the `n` highest-ranked records, sorted
///
/// Partial sort: the n-th element is selected in linear time, then only the
/// kept prefix is sorted. Returns all records (sorted) when fewer than `n`
/// are supplied and nothing when `n` is zero.
///
/// # Example
///
/// ```rust
/// use kuba_congestion::aggregation::select_top_n;
/// use kuba_congestion::types::Record;
///
/// let records = vec![
///     Record::new(0, "A", 5),
///     Record::new(1, "B", 9),
///     Record::new(2, "C", 7),
/// ];
/// let top = select_top_n(records, 2);
/// assert_eq!(top[0].source_id, "B");
/// assert_eq!(top[1].source_id, "C");
/// ```
pub fn select_top_n(mut records: Vec<Record>, n: usize) -> Vec<Record> {
    if n == 0 {
        return Vec::new();
    }

    if records.len() > n {
        records.select_nth_unstable_by(n - 1, congestion_order);
        records.truncate(n);
    }
    records.sort_unstable_by(congestion_order);
    records
}
