use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use crate::{
    config::DatabaseConfig,
    data::{
        schema::{ColumnId, ColumnType, Row, TableSchema},
        segment::Segment,
        RowId,
    },
    database::ConflictType,
    error::{KnnError, Result},
    index::{
        hnsw::{config::HnswConfig, HnswIndex},
        IndexInfo, IndexKind, IndexPart, TableIndex,
    },
    query::{
        executor::{execute, SearchContext},
        KnnRequest, KnnResult,
    },
};

struct TableData {
    segments: Vec<Segment>,
    row_count: usize,
}

/// A resolved index part, checked against the schema but not built yet.
struct PartPlan {
    column_id: ColumnId,
    column_name: String,
    dimension: usize,
    config: HnswConfig,
}

/// A named table: an append-only list of segments plus the indexes built
/// over its vector columns.
///
/// Lock order is data, then the index map, then an individual graph.
pub struct Table {
    name: String,
    schema: TableSchema,
    config: DatabaseConfig,
    data: RwLock<TableData>,
    indexes: RwLock<BTreeMap<String, Arc<TableIndex>>>,
}

impl Table {
    pub(crate) fn new(name: String, schema: TableSchema, config: DatabaseConfig) -> Self {
        Table {
            name,
            schema,
            config,
            data: RwLock::new(TableData {
                segments: Vec::new(),
                row_count: 0,
            }),
            indexes: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.data.read().row_count
    }

    pub fn segment_count(&self) -> usize {
        self.data.read().segments.len()
    }

    /// Appends rows and returns their ids in input order. Every row is
    /// checked before any is stored, so a bad row stores nothing. Non-null
    /// vectors are added to every index on their column.
    #[instrument(skip(self, rows), fields(table = %self.name, rows = rows.len()))]
    pub fn insert(&self, rows: Vec<Row>) -> Result<Vec<RowId>> {
        let arranged = rows
            .into_iter()
            .map(|row| self.schema.arrange(row))
            .collect::<Result<Vec<_>>>()?;

        let mut data = self.data.write();
        let mut row_ids = Vec::with_capacity(arranged.len());
        for values in arranged {
            if data.segments.last().map_or(true, Segment::is_full) {
                let id = data.segments.len() as u32;
                data.segments
                    .push(Segment::new(id, self.config.segment_capacity, &self.schema));
                debug!(segment = id, "opened segment");
            }
            if let Some(segment) = data.segments.last_mut() {
                row_ids.push(segment.append(values));
            }
        }
        data.row_count += row_ids.len();

        let indexes = self.indexes.read();
        for index in indexes.values() {
            for part in index.parts() {
                for row_id in &row_ids {
                    let embedding = data
                        .segments
                        .get(row_id.segment_id() as usize)
                        .and_then(|segment| segment.vector_column(part.column_id()))
                        .and_then(|column| column.get(row_id.segment_offset() as usize));
                    if let Some(embedding) = embedding {
                        part.insert(*row_id, embedding);
                    }
                }
            }
        }

        Ok(row_ids)
    }

    /// Builds an index with one HNSW graph per listed column.
    ///
    /// The table's rows are read-locked for the whole build, and the new
    /// index is published before the lock is released, so no concurrent
    /// append can be missed. With [`ConflictType::Replace`] the old index
    /// stays in place until the new one is complete.
    #[instrument(skip(self, infos), fields(table = %self.name))]
    pub fn create_index(
        &self,
        name: &str,
        infos: Vec<IndexInfo>,
        conflict: ConflictType,
    ) -> Result<()> {
        if self.indexes.read().contains_key(name) {
            match conflict {
                ConflictType::Error => return Err(KnnError::DuplicateIndex(name.to_string())),
                ConflictType::Ignore => return Ok(()),
                ConflictType::Replace => {}
            }
        }

        let plans = self.plan_index(&infos)?;

        let data = self.data.read();
        let mut parts = Vec::with_capacity(plans.len());
        for plan in plans {
            let rows = data.segments.iter().flat_map(|segment| {
                let column = segment.vector_column(plan.column_id);
                column.into_iter().flat_map(move |column| {
                    column
                        .iter()
                        .map(move |(offset, v)| (RowId::new(segment.id(), offset as u32), v))
                })
            });
            let graph = HnswIndex::build(plan.dimension, plan.config, rows)?;
            info!(
                index = name,
                column = %plan.column_name,
                nodes = graph.len(),
                metric = %plan.config.metric,
                "built hnsw index"
            );
            parts.push(Arc::new(IndexPart::new(
                plan.column_id,
                plan.column_name,
                graph,
            )));
        }

        let mut indexes = self.indexes.write();
        if indexes.contains_key(name) {
            match conflict {
                ConflictType::Error => return Err(KnnError::DuplicateIndex(name.to_string())),
                ConflictType::Ignore => return Ok(()),
                ConflictType::Replace => info!(index = name, "replacing index"),
            }
        }
        indexes.insert(
            name.to_string(),
            Arc::new(TableIndex::new(name.to_string(), parts)),
        );
        drop(indexes);
        drop(data);
        Ok(())
    }

    fn plan_index(&self, infos: &[IndexInfo]) -> Result<Vec<PartPlan>> {
        if infos.is_empty() {
            return Err(KnnError::InvalidArgument(
                "index needs at least one column".to_string(),
            ));
        }

        let mut plans: Vec<PartPlan> = Vec::with_capacity(infos.len());
        for info in infos {
            let (column_id, column) = self
                .schema
                .column(&info.column_name)
                .ok_or_else(|| KnnError::ColumnNotFound(info.column_name.clone()))?;
            let dimension = match column.column_type {
                ColumnType::Vector { dimension, .. } => dimension,
                _ => return Err(KnnError::NotAVectorColumn(column.name.clone())),
            };
            if info.kind == IndexKind::IvfFlat {
                return Err(KnnError::NotSupported("index type ivfflat".to_string()));
            }
            if plans.iter().any(|plan| plan.column_id == column_id) {
                return Err(KnnError::InvalidIndexParameter(format!(
                    "column {} listed twice",
                    column.name
                )));
            }
            plans.push(PartPlan {
                column_id,
                column_name: column.name.clone(),
                dimension,
                config: HnswConfig::from_parameters(&info.parameters)?,
            });
        }
        Ok(plans)
    }

    #[instrument(skip(self), fields(table = %self.name))]
    pub fn drop_index(&self, name: &str, conflict: ConflictType) -> Result<()> {
        if conflict == ConflictType::Replace {
            return Err(KnnError::InvalidArgument(
                "replace is not a valid conflict type for drop".to_string(),
            ));
        }
        match self.indexes.write().remove(name) {
            Some(_) => {
                info!(index = name, "dropped index");
                Ok(())
            }
            None if conflict == ConflictType::Ignore => Ok(()),
            None => Err(KnnError::IndexNotFound(name.to_string())),
        }
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indexes.read().keys().cloned().collect()
    }

    /// The part of index `name` built on `column`.
    pub fn index_part(&self, name: &str, column: &str) -> Result<Arc<IndexPart>> {
        let indexes = self.indexes.read();
        let index = indexes
            .get(name)
            .ok_or_else(|| KnnError::IndexNotFound(name.to_string()))?;
        index
            .parts()
            .iter()
            .find(|part| part.column_name() == column)
            .cloned()
            .ok_or_else(|| KnnError::ColumnNotFound(column.to_string()))
    }

    /// Validates and runs one KNN query.
    pub fn knn(&self, request: &KnnRequest) -> Result<KnnResult> {
        let data = self.data.read();
        let indexes = self.indexes.read();
        let context = SearchContext {
            schema: &self.schema,
            segments: &data.segments,
            indexes: &indexes,
            parallel: self.config.parallel_scan,
        };
        execute(&context, request)
    }
}
