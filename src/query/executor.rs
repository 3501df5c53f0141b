use std::{collections::BTreeMap, sync::Arc};

use tracing::debug;

use crate::{
    data::{
        schema::{ColumnId, TableSchema, Value},
        segment::Segment,
        QueryResult, RowId,
    },
    error::Result,
    index::{linscan, DistanceMetric, IndexPart, TableIndex},
};

use super::{
    validate::{validate, OutputColumn, ValidatedQuery},
    KnnRequest, KnnResult, SearchPath,
};

/// One way of answering a validated query.
pub trait Searcher {
    fn search(&self, query: &[f32], n: usize) -> Vec<QueryResult>;
    fn path(&self) -> SearchPath;
}

/// Exact scan over every segment of a column.
pub struct BruteForce<'a> {
    segments: &'a [Segment],
    column_id: ColumnId,
    metric: DistanceMetric,
    parallel: bool,
}

impl Searcher for BruteForce<'_> {
    fn search(&self, query: &[f32], n: usize) -> Vec<QueryResult> {
        linscan::scan_segments(
            self.segments,
            self.column_id,
            query,
            self.metric,
            n,
            self.parallel,
        )
    }

    fn path(&self) -> SearchPath {
        SearchPath::BruteForce
    }
}

/// Graph search through one part of a named index.
pub struct IndexSearch<'a> {
    index_name: &'a str,
    part: &'a IndexPart,
}

impl Searcher for IndexSearch<'_> {
    fn search(&self, query: &[f32], n: usize) -> Vec<QueryResult> {
        self.part.search(query, n)
    }

    fn path(&self) -> SearchPath {
        SearchPath::Index(self.index_name.to_string())
    }
}

/// Everything a query reads, borrowed from a table while its locks are held.
pub(crate) struct SearchContext<'a> {
    pub schema: &'a TableSchema,
    pub segments: &'a [Segment],
    pub indexes: &'a BTreeMap<String, Arc<TableIndex>>,
    pub parallel: bool,
}

pub(crate) fn execute(context: &SearchContext<'_>, request: &KnnRequest) -> Result<KnnResult> {
    let validated = validate(context.schema, request)?;
    let searcher = select_searcher(context, &validated);
    let rows = searcher.search(&validated.query, validated.top_n);
    let path = searcher.path();

    debug!(
        column = %validated.column_name,
        metric = %validated.metric,
        top_n = validated.top_n,
        hits = rows.len(),
        path = %path,
        "knn search finished"
    );

    let output = project(context.segments, &rows, &validated.output);
    Ok(KnnResult { rows, output, path })
}

/// The first index, by name, with a part on the queried column built for
/// the queried metric. Falls back to a scan.
fn select_searcher<'a>(
    context: &SearchContext<'a>,
    validated: &ValidatedQuery,
) -> Box<dyn Searcher + 'a> {
    let indexes: &'a BTreeMap<String, Arc<TableIndex>> = context.indexes;
    for index in indexes.values() {
        if let Some(part) = index.matching_part(validated.column_id, validated.metric) {
            return Box::new(IndexSearch {
                index_name: index.name(),
                part,
            });
        }
    }

    Box::new(BruteForce {
        segments: context.segments,
        column_id: validated.column_id,
        metric: validated.metric,
        parallel: context.parallel,
    })
}

fn project(segments: &[Segment], rows: &[QueryResult], output: &[OutputColumn]) -> Vec<Vec<Value>> {
    if output.is_empty() {
        return Vec::new();
    }

    rows.iter()
        .map(|row| {
            output
                .iter()
                .map(|column| match column {
                    OutputColumn::RowId => Value::Integer(row.row_id.as_u64() as i64),
                    OutputColumn::Column(column_id) => cell(segments, row.row_id, *column_id),
                })
                .collect()
        })
        .collect()
}

fn cell(segments: &[Segment], row_id: RowId, column_id: ColumnId) -> Value {
    segments
        .get(row_id.segment_id() as usize)
        .filter(|segment| row_id.segment_offset() < segment.row_count())
        .map_or(Value::Null, |segment| {
            segment.value(column_id, row_id.segment_offset())
        })
}
