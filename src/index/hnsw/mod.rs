use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::{DenseVector, QueryResult, RowId},
    error::{KnnError, Result},
    index::DistanceMetric,
};

use config::{HnswConfig, DEFAULT_SEED};

pub mod config;
mod construction;
mod search;

/// Upper bound on the level a node can be assigned.
pub const MAX_LEVEL: usize = 16;

/// Kind header written in front of a serialized index.
const HNSW_IDENTIFIER: u32 = 4;

/// A Hierarchical Navigable Small World graph over one vector column.
///
/// Nodes are numbered in insertion order. Each node keeps one neighbour
/// list per level it lives on; `links[node][0]` is the base layer.
#[derive(Debug, Serialize, Deserialize)]
pub struct HnswIndex {
    pub(super) config: HnswConfig,
    pub(super) dimension: usize,
    pub(super) vectors: Vec<DenseVector>,
    pub(super) row_ids: Vec<RowId>,
    pub(super) links: Vec<Vec<Vec<usize>>>,
    pub(super) entry_point: Option<usize>,
    pub(super) max_level: usize,
    #[serde(skip, default = "default_rng")]
    rng: StdRng,
}

fn default_rng() -> StdRng {
    StdRng::seed_from_u64(DEFAULT_SEED)
}

impl HnswIndex {
    pub fn new(dimension: usize, config: HnswConfig) -> Result<Self> {
        config.validate()?;
        if dimension == 0 {
            return Err(KnnError::InvalidIndexParameter(
                "dimension must be positive".to_string(),
            ));
        }
        Ok(HnswIndex {
            config,
            dimension,
            vectors: Vec::new(),
            row_ids: Vec::new(),
            links: Vec::new(),
            entry_point: None,
            max_level: 0,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Builds a graph from existing rows, inserting them in the given order.
    pub fn build<'a, I>(dimension: usize, config: HnswConfig, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (RowId, &'a [f32])>,
    {
        let mut index = HnswIndex::new(dimension, config)?;
        for (row_id, embedding) in rows {
            index.insert(row_id, embedding)?;
        }
        debug!(
            nodes = index.len(),
            max_level = index.max_level,
            metric = %index.config.metric,
            "hnsw graph built"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    /// Adds one row. Later searches can return it.
    pub fn insert(&mut self, row_id: RowId, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(KnnError::InvalidEmbedding(format!(
                "index expects {} values, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        self.add_node(row_id, embedding);
        Ok(())
    }

    /// Links a row whose embedding already has the graph's dimension.
    pub(crate) fn add_node(&mut self, row_id: RowId, embedding: &[f32]) {
        debug_assert_eq!(embedding.len(), self.dimension);
        let level = self.random_level();
        let node = self.vectors.len();
        self.vectors.push(DenseVector::new(embedding.to_vec()));
        self.row_ids.push(row_id);
        self.links.push(vec![Vec::new(); level + 1]);
        self.index_vector(node);
    }

    /// Approximate `k` nearest rows, best first. `ef` bounds the beam on
    /// the base layer and is raised to `k` if smaller.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<QueryResult> {
        if k == 0 || query.len() != self.dimension {
            return Vec::new();
        }

        let mut found = self.search_knn(query, k, ef.max(k));
        found.truncate(k);
        found
            .into_iter()
            .map(|neighbor| QueryResult {
                row_id: self.row_ids[neighbor.id],
                score: self.config.metric.from_rank(neighbor.distance.into_inner()),
            })
            .collect()
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(HNSW_IDENTIFIER)?;
        bincode::serialize_into(&mut *writer, self)?;
        Ok(())
    }

    pub fn load_index<R: Read>(reader: &mut R) -> Result<Self> {
        let identifier = reader.read_u32::<BigEndian>()?;
        if identifier != HNSW_IDENTIFIER {
            return Err(corrupt(format!(
                "unexpected index identifier {}",
                identifier
            )));
        }

        let mut index: HnswIndex = bincode::deserialize_from(&mut *reader)?;
        index.check_consistency()?;
        index.rng = StdRng::seed_from_u64(index.config.seed.wrapping_add(index.len() as u64));
        Ok(index)
    }

    fn check_consistency(&self) -> Result<()> {
        let nodes = self.vectors.len();
        if self.row_ids.len() != nodes || self.links.len() != nodes {
            return Err(corrupt("node tables differ in length".to_string()));
        }
        if self.entry_point.map_or(nodes != 0, |entry| entry >= nodes) {
            return Err(corrupt("entry point out of range".to_string()));
        }
        let dangling = self
            .links
            .iter()
            .flatten()
            .flatten()
            .any(|&neighbor| neighbor >= nodes);
        if dangling || self.vectors.iter().any(|v| v.len() != self.dimension) {
            return Err(corrupt("graph references missing nodes".to_string()));
        }
        Ok(())
    }

    pub(super) fn neighbors(&self, id: usize, level: usize) -> &[usize] {
        self.links[id]
            .get(level)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(super) fn distance_to(&self, query: &[f32], id: usize) -> f32 {
        self.config
            .metric
            .rank_distance(query, &self.vectors[id].values)
    }

    pub(super) fn node_distance(&self, a: usize, b: usize) -> f32 {
        self.vectors[a].distance(&self.vectors[b].values, self.config.metric)
    }

    /// Draws a level from the exponential distribution `-ln(U) / ln(M)`.
    pub(super) fn random_level(&mut self) -> usize {
        let uniform: f64 = self.rng.gen();
        let level = (-(1.0 - uniform).ln() * self.config.level_multiplier()).floor();
        (level as usize).min(MAX_LEVEL)
    }
}

fn corrupt(message: String) -> KnnError {
    KnnError::Serialization(Box::new(bincode::ErrorKind::Custom(message)))
}
