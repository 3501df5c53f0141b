use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::{info, instrument};

use crate::{
    config::DatabaseConfig,
    data::schema::TableSchema,
    error::{KnnError, Result},
    index::IndexInfo,
    query::{KnnRequest, KnnResult},
    table::Table,
};

/// What to do when a create finds the name taken, or a drop finds it
/// missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictType {
    #[default]
    Error,
    Ignore,
    /// Only valid for creates.
    Replace,
}

/// In-process catalog of tables.
pub struct Database {
    config: DatabaseConfig,
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Default for Database {
    fn default() -> Self {
        Database::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Database {
            config: DatabaseConfig::default(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_config(config: DatabaseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Database {
            config,
            tables: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    #[instrument(skip(self, schema))]
    pub fn create_table(
        &self,
        name: &str,
        schema: TableSchema,
        conflict: ConflictType,
    ) -> Result<Arc<Table>> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.get(name) {
            match conflict {
                ConflictType::Error => return Err(KnnError::DuplicateTable(name.to_string())),
                ConflictType::Ignore => return Ok(Arc::clone(existing)),
                ConflictType::Replace => info!(table = name, "replacing table"),
            }
        }

        let table = Arc::new(Table::new(name.to_string(), schema, self.config.clone()));
        tables.insert(name.to_string(), Arc::clone(&table));
        info!(table = name, columns = table.schema().len(), "created table");
        Ok(table)
    }

    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| KnnError::TableNotFound(name.to_string()))
    }

    #[instrument(skip(self))]
    pub fn drop_table(&self, name: &str, conflict: ConflictType) -> Result<()> {
        if conflict == ConflictType::Replace {
            return Err(KnnError::InvalidArgument(
                "replace is not a valid conflict type for drop".to_string(),
            ));
        }
        match self.tables.write().remove(name) {
            Some(_) => {
                info!(table = name, "dropped table");
                Ok(())
            }
            None if conflict == ConflictType::Ignore => Ok(()),
            None => Err(KnnError::TableNotFound(name.to_string())),
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn create_index(
        &self,
        table: &str,
        index: &str,
        infos: Vec<IndexInfo>,
        conflict: ConflictType,
    ) -> Result<()> {
        self.get_table(table)?.create_index(index, infos, conflict)
    }

    pub fn drop_index(&self, table: &str, index: &str, conflict: ConflictType) -> Result<()> {
        self.get_table(table)?.drop_index(index, conflict)
    }

    /// Runs one KNN query against `table`.
    pub fn knn_search(&self, table: &str, request: &KnnRequest) -> Result<KnnResult> {
        self.get_table(table)?.knn(request)
    }
}
