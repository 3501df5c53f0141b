//! Error types for the vector search core.
//!
//! Every failure carries a stable numeric code (see [`KnnError::code`]) and
//! belongs to one [`ErrorClass`], so callers can tell a malformed request
//! apart from an unsupported parameter or a catalog problem.

// =============================================================================
// Error codes
// =============================================================================

/// Generic invalid argument raised while constructing a request.
pub const ERR_INVALID_ARGUMENT: i32 = 7001;

/// Non-vector column used as a KNN target.
pub const ERR_NOT_A_VECTOR_COLUMN: i32 = 3013;

/// Result count is zero or negative.
pub const ERR_INVALID_TOPN: i32 = 3014;

/// Table already exists.
pub const ERR_DUPLICATE_TABLE: i32 = 3017;

/// Index already exists.
pub const ERR_DUPLICATE_INDEX: i32 = 3018;

pub const ERR_TABLE_NOT_FOUND: i32 = 3022;

pub const ERR_INDEX_NOT_FOUND: i32 = 3023;

pub const ERR_COLUMN_NOT_FOUND: i32 = 3024;

/// Index parameter bag could not be turned into a configuration.
pub const ERR_INVALID_INDEX_PARAMETER: i32 = 3029;

/// Declared-but-unimplemented element type, metric or index kind.
pub const ERR_NOT_SUPPORTED: i32 = 3032;

/// Row value does not fit the column it targets.
pub const ERR_INVALID_ROW: i32 = 3040;

pub const ERR_IO: i32 = 5001;

pub const ERR_SERIALIZATION: i32 = 5002;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, KnnError>;

/// Coarse failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Column missing or of the wrong kind.
    Schema,
    /// Malformed literal or token, rejected before the engine runs.
    RequestShape,
    /// Well-formed request the engine refuses with a stable code.
    EngineParameter,
    /// Table or index lookup and conflict failures.
    Catalog,
    /// Index persistence failures.
    Storage,
}

#[derive(Debug, thiserror::Error)]
pub enum KnnError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    DuplicateTable(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Index already exists: {0}")]
    DuplicateIndex(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column {0} is not a vector column")]
    NotAVectorColumn(String),

    #[error("Invalid embedding data: {0}")]
    InvalidEmbedding(String),

    #[error("Invalid embedding element type: {0}")]
    InvalidElementType(String),

    #[error("Invalid distance metric: {0}")]
    InvalidMetric(String),

    #[error("Invalid topn type: {0}")]
    InvalidTopNType(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("ERROR:3014 Invalid topn: {0}, topn must be greater than 0")]
    InvalidTopN(i64),

    #[error("ERROR:3032 Not supported: {0}")]
    NotSupported(String),

    #[error("Invalid index parameter: {0}")]
    InvalidIndexParameter(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl KnnError {
    /// Stable numeric code for this error.
    pub fn code(&self) -> i32 {
        match self {
            KnnError::TableNotFound(_) => ERR_TABLE_NOT_FOUND,
            KnnError::DuplicateTable(_) => ERR_DUPLICATE_TABLE,
            KnnError::IndexNotFound(_) => ERR_INDEX_NOT_FOUND,
            KnnError::DuplicateIndex(_) => ERR_DUPLICATE_INDEX,
            KnnError::ColumnNotFound(_) => ERR_COLUMN_NOT_FOUND,
            KnnError::NotAVectorColumn(_) => ERR_NOT_A_VECTOR_COLUMN,
            KnnError::InvalidEmbedding(_)
            | KnnError::InvalidElementType(_)
            | KnnError::InvalidMetric(_)
            | KnnError::InvalidTopNType(_)
            | KnnError::InvalidArgument(_) => ERR_INVALID_ARGUMENT,
            KnnError::InvalidTopN(_) => ERR_INVALID_TOPN,
            KnnError::NotSupported(_) => ERR_NOT_SUPPORTED,
            KnnError::InvalidIndexParameter(_) => ERR_INVALID_INDEX_PARAMETER,
            KnnError::InvalidRow(_) => ERR_INVALID_ROW,
            KnnError::Io(_) => ERR_IO,
            KnnError::Serialization(_) => ERR_SERIALIZATION,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            KnnError::ColumnNotFound(_) | KnnError::NotAVectorColumn(_) => ErrorClass::Schema,
            KnnError::InvalidEmbedding(_)
            | KnnError::InvalidElementType(_)
            | KnnError::InvalidMetric(_)
            | KnnError::InvalidTopNType(_)
            | KnnError::InvalidArgument(_)
            | KnnError::InvalidRow(_) => ErrorClass::RequestShape,
            KnnError::InvalidTopN(_)
            | KnnError::NotSupported(_)
            | KnnError::InvalidIndexParameter(_) => ErrorClass::EngineParameter,
            KnnError::TableNotFound(_)
            | KnnError::DuplicateTable(_)
            | KnnError::IndexNotFound(_)
            | KnnError::DuplicateIndex(_) => ErrorClass::Catalog,
            KnnError::Io(_) | KnnError::Serialization(_) => ErrorClass::Storage,
        }
    }
}
