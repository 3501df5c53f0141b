use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    data::{ElementType, RowId},
    error::Result,
    index::{DistanceMetric, MetricKind},
    query::{EmbeddingLiteral, KnnRequest, SearchPath},
    table::Table,
};

pub mod logger;
pub mod metrics;

/// Runs `f` and returns its value together with the wall time it took.
pub fn measure_time<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Outcome of running one query batch along one search path.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub timestamp: DateTime<Local>,
    pub path: String,
    pub metric: DistanceMetric,
    pub dataset_size: usize,
    pub dataset_dimensionality: usize,
    pub queries: usize,
    pub top_n: usize,
    pub build_time: Duration,
    pub query_time: Duration,
    pub queries_per_second: f64,
    pub recall: f32,
}

/// Answers of one query batch, in query order.
pub struct QueryBatch {
    pub results: Vec<Vec<RowId>>,
    pub path: SearchPath,
    pub elapsed: Duration,
}

/// Runs every query against `table` on the rayon pool.
pub fn run_queries(
    table: &Table,
    column: &str,
    queries: &[Vec<f32>],
    metric: DistanceMetric,
    top_n: usize,
) -> Result<QueryBatch> {
    let requests = queries
        .iter()
        .map(|query| {
            let embedding = EmbeddingLiteral::Float(query.iter().map(|&v| v as f64).collect());
            KnnRequest::from_parts(
                column,
                embedding,
                ElementType::Float32,
                MetricKind::from(metric),
                top_n as i64,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let (answers, elapsed) = measure_time(|| {
        requests
            .par_iter()
            .map(|request| table.knn(request))
            .collect::<Result<Vec<_>>>()
    });
    let answers = answers?;

    let path = answers
        .first()
        .map(|answer| answer.path.clone())
        .unwrap_or(SearchPath::BruteForce);
    Ok(QueryBatch {
        results: answers.iter().map(|answer| answer.row_ids()).collect(),
        path,
        elapsed,
    })
}
