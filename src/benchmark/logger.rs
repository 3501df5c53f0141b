use std::{fs::OpenOptions, path::Path};

use csv::WriterBuilder;
use serde::Serialize;

use super::BenchmarkResult;

/// One CSV line of a benchmark run.
#[derive(Serialize)]
struct BenchmarkRecord {
    timestamp: String,
    path: String,
    metric: String,
    dataset_size: usize,
    dataset_dimensionality: usize,
    queries: usize,
    top_n: usize,
    build_time: f32,
    query_time: f32,
    queries_per_second: f64,
    recall: f32,
}

impl From<&BenchmarkResult> for BenchmarkRecord {
    fn from(result: &BenchmarkResult) -> Self {
        BenchmarkRecord {
            timestamp: result.timestamp.to_rfc3339(),
            path: result.path.clone(),
            metric: result.metric.to_string(),
            dataset_size: result.dataset_size,
            dataset_dimensionality: result.dataset_dimensionality,
            queries: result.queries,
            top_n: result.top_n,
            build_time: result.build_time.as_secs_f32(),
            query_time: result.query_time.as_secs_f32(),
            queries_per_second: result.queries_per_second,
            recall: result.recall,
        }
    }
}

#[derive(Default)]
pub struct BenchmarkLogger {
    records: Vec<BenchmarkResult>,
}

impl BenchmarkLogger {
    pub fn new() -> Self {
        BenchmarkLogger::default()
    }

    pub fn add_record(&mut self, result: BenchmarkResult) {
        self.records.push(result);
    }

    pub fn records(&self) -> &[BenchmarkResult] {
        &self.records
    }

    /// Appends every record to `file_path`, writing a header only when the
    /// file is new or empty.
    pub fn write_to_csv(&self, file_path: impl AsRef<Path>) -> Result<(), csv::Error> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path.as_ref())?;
        let write_header = file.metadata()?.len() == 0;
        let mut writer = WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);

        for record in &self.records {
            writer.serialize(BenchmarkRecord::from(record))?;
        }

        writer.flush()?;
        Ok(())
    }
}
