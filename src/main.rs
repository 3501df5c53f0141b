use std::{
    error::Error,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
    time::Duration,
};

use chrono::Local;
use clap::Parser;
use knn_engine::{
    benchmark::{
        logger::BenchmarkLogger,
        measure_time,
        metrics::{calculate_average_recall, calculate_queries_per_second},
        run_queries, BenchmarkResult, QueryBatch,
    },
    data::generator::DenseDataGenerator,
    index::hnsw::config::{DEFAULT_EF, DEFAULT_EF_CONSTRUCTION, DEFAULT_M},
    ConflictType, Database, DistanceMetric, HnswIndex, IndexInfo, IndexKind, InitParameter,
    MetricKind, Row, TableSchema,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TABLE: &str = "bench";
const COLUMN: &str = "embedding";
const INDEX: &str = "embedding_hnsw";
const INSERT_BATCH: usize = 1024;

/// Compares brute-force and HNSW search over a synthetic table.
#[derive(Parser)]
struct Args {
    #[clap(long, short, default_value_t = 10_000)]
    rows: usize,
    #[clap(long, short, default_value_t = 64)]
    dimensions: usize,
    #[clap(long, short, default_value_t = 100)]
    queries: usize,
    #[clap(long, short = 'k', default_value_t = 10)]
    top_n: usize,
    #[clap(long, default_value = "l2")]
    metric: String,
    #[clap(long, short = 'm', default_value_t = DEFAULT_M)]
    m: usize,
    #[clap(long, default_value_t = DEFAULT_EF_CONSTRUCTION)]
    ef_construction: usize,
    #[clap(long, default_value_t = DEFAULT_EF)]
    ef: usize,
    #[clap(long, default_value_t = 42)]
    seed: u64,
    /// Directory the CSV report is appended to.
    #[clap(long, short, default_value = "benchmark_results")]
    output: PathBuf,
    /// Also write the built index to this file and time reloading it.
    #[clap(long)]
    save_index: Option<PathBuf>,
    #[clap(long, short, action)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let metric = args.metric.parse::<MetricKind>()?.implemented()?;
    let db = Database::new();
    let column_type = format!("vector,{},float", args.dimensions);
    let schema = TableSchema::from_pairs(&[("id", "integer"), (COLUMN, column_type.as_str())])?;
    let table = db.create_table(TABLE, schema, ConflictType::Replace)?;

    let vectors =
        DenseDataGenerator::new(args.dimensions, args.rows, (-1.0, 1.0), args.seed).generate();
    let query_vectors = DenseDataGenerator::new(
        args.dimensions,
        args.queries,
        (-1.0, 1.0),
        args.seed.wrapping_add(1),
    )
    .generate();

    let mut next_id = 0i64;
    for batch in vectors.chunks(INSERT_BATCH) {
        let rows = batch
            .iter()
            .map(|vector| {
                next_id += 1;
                Row::new().with("id", next_id).with(COLUMN, vector.clone())
            })
            .collect();
        table.insert(rows)?;
    }
    info!(rows = table.row_count(), dimensions = args.dimensions, "generated table");

    let mut logger = BenchmarkLogger::new();

    let exact = run_queries(&table, COLUMN, &query_vectors, metric, args.top_n)?;
    logger.add_record(record(&args, metric, &exact, Duration::ZERO, 1.0));
    print_batch("brute force", &exact, 1.0);

    let parameters = vec![
        InitParameter::new("M", args.m.to_string()),
        InitParameter::new("ef_construction", args.ef_construction.to_string()),
        InitParameter::new("ef", args.ef.to_string()),
        InitParameter::new("metric", metric.name()),
    ];
    let (created, build_time) = measure_time(|| {
        table.create_index(
            INDEX,
            vec![IndexInfo::new(COLUMN, IndexKind::Hnsw, parameters)],
            ConflictType::Replace,
        )
    });
    created?;
    println!("Index build time: {:?}", build_time);

    let approximate = run_queries(&table, COLUMN, &query_vectors, metric, args.top_n)?;
    let recall = calculate_average_recall(&approximate.results, &exact.results, args.top_n);
    logger.add_record(record(&args, metric, &approximate, build_time, recall));
    print_batch("hnsw", &approximate, recall);

    fs::create_dir_all(&args.output)?;
    let report = args
        .output
        .join(format!("knn_bench_{}.csv", Local::now().format("%Y-%m-%d")));
    logger.write_to_csv(&report)?;
    println!("Report appended to {}", report.display());

    if let Some(path) = &args.save_index {
        let part = table.index_part(INDEX, COLUMN)?;
        let (saved, save_time) = measure_time(|| -> knn_engine::Result<()> {
            let mut writer = BufWriter::new(File::create(path)?);
            part.save(&mut writer)?;
            writer.flush()?;
            Ok(())
        });
        saved?;

        let (loaded, load_time) = measure_time(|| -> knn_engine::Result<HnswIndex> {
            HnswIndex::load_index(&mut BufReader::new(File::open(path)?))
        });
        let loaded = loaded?;
        let disk_space = fs::metadata(path)?.len() as f32 / (1024.0 * 1024.0);
        println!(
            "Index saved in {:?}, loaded in {:?} ({} nodes, {:.2} MB)",
            save_time,
            load_time,
            loaded.len(),
            disk_space
        );
    }

    Ok(())
}

fn record(
    args: &Args,
    metric: DistanceMetric,
    batch: &QueryBatch,
    build_time: Duration,
    recall: f32,
) -> BenchmarkResult {
    BenchmarkResult {
        timestamp: Local::now(),
        path: batch.path.to_string(),
        metric,
        dataset_size: args.rows,
        dataset_dimensionality: args.dimensions,
        queries: args.queries,
        top_n: args.top_n,
        build_time,
        query_time: batch.elapsed,
        queries_per_second: calculate_queries_per_second(batch.elapsed, args.queries),
        recall,
    }
}

fn print_batch(label: &str, batch: &QueryBatch, recall: f32) {
    println!("\n--- {} ({}) ---", label, batch.path);
    println!("Query time: {:?}", batch.elapsed);
    println!(
        "Queries per second: {:.2}",
        calculate_queries_per_second(batch.elapsed, batch.results.len())
    );
    println!("Average recall: {:.4}", recall);
}
