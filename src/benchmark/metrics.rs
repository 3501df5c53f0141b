use std::{collections::HashSet, time::Duration};

use crate::data::RowId;

/// Queries per second for `query_count` queries that took
/// `total_queries_execution_time` in total.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use knn_engine::benchmark::metrics::calculate_queries_per_second;
///
/// let qps = calculate_queries_per_second(Duration::from_millis(500), 10);
/// assert_eq!(qps, 20.0);
/// ```
pub fn calculate_queries_per_second(
    total_queries_execution_time: Duration,
    query_count: usize,
) -> f64 {
    if !total_queries_execution_time.is_zero() {
        query_count as f64 / total_queries_execution_time.as_secs_f64()
    } else {
        0.0
    }
}

/// Fraction of the first `k` ground-truth rows that appear in `results`.
pub fn calculate_recall(results: &[RowId], groundtruth: &[RowId], k: usize) -> f32 {
    let expected: HashSet<&RowId> = groundtruth.iter().take(k).collect();
    if expected.is_empty() {
        return 1.0;
    }
    let hits = results
        .iter()
        .take(k)
        .filter(|row_id| expected.contains(row_id))
        .count();
    hits as f32 / expected.len() as f32
}

/// Mean recall over a batch of queries.
pub fn calculate_average_recall(results: &[Vec<RowId>], groundtruth: &[Vec<RowId>], k: usize) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f32 = results
        .iter()
        .zip(groundtruth)
        .map(|(result, truth)| calculate_recall(result, truth, k))
        .sum();
    total / results.len() as f32
}
