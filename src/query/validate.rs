use crate::{
    data::{
        schema::{ColumnId, ColumnType, TableSchema, ROW_ID_COLUMN},
        ElementType,
    },
    error::{KnnError, Result},
    index::DistanceMetric,
};

use super::{EmbeddingLiteral, KnnRequest};

/// A projected output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputColumn {
    RowId,
    Column(ColumnId),
}

/// A request that passed every engine-side check against one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub column_id: ColumnId,
    pub column_name: String,
    pub query: Vec<f32>,
    pub metric: DistanceMetric,
    pub top_n: usize,
    pub output: Vec<OutputColumn>,
}

/// Checks `request` against `schema`. The checks run in a fixed order and
/// the first failure is returned: column, dimension, element type, metric,
/// result count, output columns.
pub fn validate(schema: &TableSchema, request: &KnnRequest) -> Result<ValidatedQuery> {
    let (column_id, column) = schema
        .column(request.column())
        .ok_or_else(|| KnnError::ColumnNotFound(request.column().to_string()))?;
    let (dimension, element_type) = match column.column_type {
        ColumnType::Vector {
            dimension,
            element_type,
        } => (dimension, element_type),
        _ => return Err(KnnError::NotAVectorColumn(column.name.clone())),
    };

    if request.embedding().len() != dimension {
        return Err(KnnError::InvalidEmbedding(format!(
            "column {} has dimension {}, embedding has {} values",
            column.name,
            dimension,
            request.embedding().len()
        )));
    }

    check_element_type(request.embedding(), request.element_type(), element_type)?;

    let metric = request.metric().implemented()?;

    if request.top_n() <= 0 {
        return Err(KnnError::InvalidTopN(request.top_n()));
    }

    let output = request
        .output()
        .iter()
        .map(|name| {
            if name == ROW_ID_COLUMN {
                Ok(OutputColumn::RowId)
            } else {
                schema
                    .column(name)
                    .map(|(id, _)| OutputColumn::Column(id))
                    .ok_or_else(|| KnnError::ColumnNotFound(name.clone()))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ValidatedQuery {
        column_id,
        column_name: column.name.clone(),
        query: request.embedding().to_f32(),
        metric,
        top_n: request.top_n() as usize,
        output,
    })
}

/// The declared type must name the column's element type exactly; only
/// then are the literal's values checked against that type. Integer
/// literals are fine under a float declaration.
fn check_element_type(
    embedding: &EmbeddingLiteral,
    declared: ElementType,
    stored: ElementType,
) -> Result<()> {
    if declared != stored {
        return Err(KnnError::NotSupported(format!(
            "embedding type {} against a {} column",
            declared, stored
        )));
    }
    embedding.check_fits(stored)
}
