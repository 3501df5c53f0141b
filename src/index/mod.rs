use std::{fmt, io::Write, str::FromStr, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    data::{dot, schema::ColumnId, squared_euclidean_distance, QueryResult, RowId},
    error::{KnnError, Result},
};

use hnsw::{config::HnswConfig, HnswIndex};

pub mod hnsw;
pub mod linscan;
pub mod neighbor;

/// Metrics the engine can rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Squared Euclidean distance; lower is closer.
    L2,
    /// Inner product; higher is closer.
    InnerProduct,
}

impl DistanceMetric {
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::InnerProduct => "ip",
        }
    }

    /// The metric value reported to callers.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => squared_euclidean_distance(a, b),
            DistanceMetric::InnerProduct => dot(a, b),
        }
    }

    /// A value where lower is always closer, used for every internal
    /// ordering decision.
    pub fn rank_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.to_rank(self.score(a, b))
    }

    pub fn to_rank(&self, score: f32) -> f32 {
        match self {
            DistanceMetric::L2 => score,
            DistanceMetric::InnerProduct => -score,
        }
    }

    pub fn from_rank(&self, rank: f32) -> f32 {
        self.to_rank(rank)
    }

    pub fn higher_is_better(&self) -> bool {
        matches!(self, DistanceMetric::InnerProduct)
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every metric token the engine recognises, implemented or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    L2,
    InnerProduct,
    Cosine,
    Hamming,
}

impl MetricKind {
    /// Resolves to an implemented metric. Cosine and Hamming are known
    /// names without an implementation.
    pub fn implemented(self) -> Result<DistanceMetric> {
        match self {
            MetricKind::L2 => Ok(DistanceMetric::L2),
            MetricKind::InnerProduct => Ok(DistanceMetric::InnerProduct),
            MetricKind::Cosine => Err(KnnError::NotSupported("distance metric cosine".to_string())),
            MetricKind::Hamming => {
                Err(KnnError::NotSupported("distance metric hamming".to_string()))
            }
        }
    }
}

impl FromStr for MetricKind {
    type Err = KnnError;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(MetricKind::L2),
            "ip" | "inner_product" | "dot" => Ok(MetricKind::InnerProduct),
            "cosine" | "cos" => Ok(MetricKind::Cosine),
            "hamming" => Ok(MetricKind::Hamming),
            _ => Err(KnnError::InvalidMetric(token.to_string())),
        }
    }
}

impl From<DistanceMetric> for MetricKind {
    fn from(metric: DistanceMetric) -> Self {
        match metric {
            DistanceMetric::L2 => MetricKind::L2,
            DistanceMetric::InnerProduct => MetricKind::InnerProduct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Hnsw,
    IvfFlat,
}

impl FromStr for IndexKind {
    type Err = KnnError;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "hnsw" => Ok(IndexKind::Hnsw),
            "ivfflat" | "ivf_flat" => Ok(IndexKind::IvfFlat),
            _ => Err(KnnError::InvalidIndexParameter(format!(
                "unknown index type: {}",
                token
            ))),
        }
    }
}

/// One `name = value` entry of an index parameter bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitParameter {
    pub name: String,
    pub value: String,
}

impl InitParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        InitParameter {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Index request for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub column_name: String,
    pub kind: IndexKind,
    pub parameters: Vec<InitParameter>,
}

impl IndexInfo {
    pub fn new(
        column_name: impl Into<String>,
        kind: IndexKind,
        parameters: Vec<InitParameter>,
    ) -> Self {
        IndexInfo {
            column_name: column_name.into(),
            kind,
            parameters,
        }
    }
}

/// A built graph over one vector column. Refers to its column by id and
/// name only; the table owns the column.
pub struct IndexPart {
    column_id: ColumnId,
    column_name: String,
    config: HnswConfig,
    graph: RwLock<HnswIndex>,
}

impl IndexPart {
    pub(crate) fn new(column_id: ColumnId, column_name: String, graph: HnswIndex) -> Self {
        IndexPart {
            column_id,
            column_name,
            config: *graph.config(),
            graph: RwLock::new(graph),
        }
    }

    pub fn column_id(&self) -> ColumnId {
        self.column_id
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    pub fn len(&self) -> usize {
        self.graph.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn search(&self, query: &[f32], k: usize) -> Vec<QueryResult> {
        self.graph.read().search(query, k, self.config.ef.max(k))
    }

    /// Adds a stored row. The column's schema has already checked the
    /// embedding's length, and every part is built with that column's
    /// dimension, so this cannot fail.
    pub(crate) fn insert(&self, row_id: RowId, embedding: &[f32]) {
        self.graph.write().add_node(row_id, embedding);
    }

    /// Writes the graph with its kind header.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.graph.read().save(writer)
    }
}

impl fmt::Debug for IndexPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexPart")
            .field("column_name", &self.column_name)
            .field("config", &self.config)
            .field("len", &self.len())
            .finish()
    }
}

/// A named index: one graph per listed column.
#[derive(Debug)]
pub struct TableIndex {
    name: String,
    parts: Vec<Arc<IndexPart>>,
}

impl TableIndex {
    pub(crate) fn new(name: String, parts: Vec<Arc<IndexPart>>) -> Self {
        TableIndex { name, parts }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parts(&self) -> &[Arc<IndexPart>] {
        &self.parts
    }

    /// Part covering `column_id` with `metric`, if any.
    pub fn matching_part(
        &self,
        column_id: ColumnId,
        metric: DistanceMetric,
    ) -> Option<&Arc<IndexPart>> {
        self.parts
            .iter()
            .find(|part| part.column_id == column_id && part.metric() == metric)
    }
}
