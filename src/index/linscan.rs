use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    data::{schema::ColumnId, segment::Segment, QueryResult, RowId},
    data_structures::top_n::TopNHeap,
    index::DistanceMetric,
};

/// Exact top-`n` over one vector column of every segment.
///
/// Rows whose vector is null are skipped. Ties on distance go to the lower
/// row id, so repeated scans over the same data return the same rows in
/// the same order whether or not segments are scanned in parallel.
pub fn scan_segments(
    segments: &[Segment],
    column_id: ColumnId,
    query: &[f32],
    metric: DistanceMetric,
    n: usize,
    parallel: bool,
) -> Vec<QueryResult> {
    if n == 0 {
        return Vec::new();
    }

    let scan = |segment: &Segment| -> TopNHeap<RowId> {
        let mut heap = TopNHeap::new(n);
        if let Some(column) = segment.vector_column(column_id) {
            for (offset, embedding) in column.iter() {
                let row_id = RowId::new(segment.id(), offset as u32);
                heap.push(row_id, metric.rank_distance(query, embedding), row_id.as_u64());
            }
        }
        heap
    };

    let heaps: Vec<TopNHeap<RowId>> = if parallel && segments.len() > 1 {
        segments.par_iter().map(scan).collect()
    } else {
        segments.iter().map(scan).collect()
    };

    let mut merged = TopNHeap::new(n);
    for heap in heaps {
        merged.merge(heap);
    }
    into_results(merged, metric)
}

/// Exact top-`n` over loose `(row id, vector)` pairs.
pub fn scan_vectors<'a, I>(
    rows: I,
    query: &[f32],
    metric: DistanceMetric,
    n: usize,
) -> Vec<QueryResult>
where
    I: IntoIterator<Item = (RowId, &'a [f32])>,
{
    let mut heap = TopNHeap::new(n);
    for (row_id, embedding) in rows {
        heap.push(row_id, metric.rank_distance(query, embedding), row_id.as_u64());
    }
    into_results(heap, metric)
}

fn into_results(heap: TopNHeap<RowId>, metric: DistanceMetric) -> Vec<QueryResult> {
    heap.into_sorted_vec()
        .into_iter()
        .map(|(row_id, rank)| QueryResult {
            row_id,
            score: metric.from_rank(rank),
        })
        .collect()
}
