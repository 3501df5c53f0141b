//! Vector search core of a columnar table store.
//!
//! Tables hold vector columns in append-only segments. A KNN query is
//! checked against the table schema, then answered by an HNSW index built
//! for the same column and metric, or by an exact scan when no such index
//! exists.
//!
//! ```
//! use knn_engine::{ConflictType, Database, KnnRequest, Row, TableSchema};
//! use serde_json::json;
//!
//! let db = Database::new();
//! let schema = TableSchema::from_pairs(&[("v", "vector,2,float")]).unwrap();
//! let table = db.create_table("t", schema, ConflictType::Error).unwrap();
//! table
//!     .insert(vec![Row::new().with("v", vec![1.0f32, 0.0]), Row::new().with("v", vec![0.0f32, 1.0])])
//!     .unwrap();
//!
//! let request = KnnRequest::new("v", &json!([1, 0]), "float", "ip", &json!(1)).unwrap();
//! let result = db.knn_search("t", &request).unwrap();
//! assert_eq!(result.scores(), vec![1.0]);
//! ```

pub mod benchmark;
pub mod config;
pub mod data;
pub mod data_structures;
pub mod database;
pub mod error;
pub mod index;
pub mod query;
pub mod table;

pub use config::DatabaseConfig;
pub use data::{
    schema::{ColumnType, Row, TableSchema, Value, ROW_ID_COLUMN},
    ElementType, QueryResult, RowId,
};
pub use database::{ConflictType, Database};
pub use error::{KnnError, Result};
pub use index::{
    hnsw::{config::HnswConfig, HnswIndex},
    DistanceMetric, IndexInfo, IndexKind, InitParameter, MetricKind,
};
pub use query::{EmbeddingLiteral, KnnRequest, KnnResult, SearchPath};
pub use table::Table;
