use std::fmt;

use serde_json::Value as JsonValue;

use crate::{
    data::{schema::Value, ElementType, QueryResult, RowId},
    error::{KnnError, Result},
    index::MetricKind,
};

pub mod executor;
pub mod validate;

/// A query embedding as written by the caller, before it is checked
/// against any column.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingLiteral {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl EmbeddingLiteral {
    /// Accepts a flat, non-empty JSON array of numbers. Every other shape
    /// is rejected here, before a table is ever looked at.
    pub fn parse(literal: &JsonValue) -> Result<Self> {
        let items = match literal {
            JsonValue::Array(items) if !items.is_empty() => items,
            JsonValue::Array(_) => {
                return Err(KnnError::InvalidEmbedding("embedding is empty".to_string()))
            }
            other => {
                return Err(KnnError::InvalidEmbedding(format!(
                    "expected an array of numbers, got {}",
                    other
                )))
            }
        };

        let mut ints = Vec::with_capacity(items.len());
        let mut floats = Vec::with_capacity(items.len());
        let mut all_ints = true;
        for item in items {
            let number = match item {
                JsonValue::Number(number) => number,
                other => {
                    return Err(KnnError::InvalidEmbedding(format!(
                        "embedding element {} is not a number",
                        other
                    )))
                }
            };
            match number.as_i64() {
                Some(value) if all_ints => ints.push(value),
                _ => all_ints = false,
            }
            let value = number.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                KnnError::InvalidEmbedding(format!("embedding element {} is not finite", number))
            })?;
            floats.push(value);
        }

        if all_ints {
            Ok(EmbeddingLiteral::Int(ints))
        } else {
            Ok(EmbeddingLiteral::Float(floats))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EmbeddingLiteral::Int(values) => values.len(),
            EmbeddingLiteral::Float(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            EmbeddingLiteral::Int(values) => values.iter().map(|&v| v as f64).collect(),
            EmbeddingLiteral::Float(values) => values.clone(),
        }
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.to_f64().into_iter().map(|v| v as f32).collect()
    }

    /// Checks that every value fits `element_type`.
    pub(crate) fn check_fits(&self, element_type: ElementType) -> Result<()> {
        match self.to_f64().into_iter().find(|&v| !element_type.accepts(v)) {
            Some(value) => Err(KnnError::InvalidEmbedding(format!(
                "{} does not fit embedding type {}",
                value, element_type
            ))),
            None => Ok(()),
        }
    }
}

/// A checked KNN request. Construction rejects malformed literals and
/// unknown tokens; everything that depends on the table is checked by
/// [`validate::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct KnnRequest {
    column: String,
    embedding: EmbeddingLiteral,
    element_type: ElementType,
    metric: MetricKind,
    top_n: i64,
    output: Vec<String>,
}

impl KnnRequest {
    /// Builds a request from loosely typed client input.
    ///
    /// `embedding` and `top_n` are JSON values so that callers can pass
    /// whatever their client produced: tuples and lists are arrays, while
    /// scalars, strings, and maps are rejected.
    pub fn new(
        column: impl Into<String>,
        embedding: &JsonValue,
        element_type: &str,
        metric: &str,
        top_n: &JsonValue,
    ) -> Result<Self> {
        let embedding = EmbeddingLiteral::parse(embedding)?;
        let element_type: ElementType = element_type.parse()?;
        let metric: MetricKind = metric.parse()?;
        let top_n = match top_n {
            JsonValue::Number(number) => number.as_i64(),
            _ => None,
        }
        .ok_or_else(|| KnnError::InvalidTopNType(top_n.to_string()))?;

        KnnRequest::from_parts(column, embedding, element_type, metric, top_n)
    }

    pub fn from_parts(
        column: impl Into<String>,
        embedding: EmbeddingLiteral,
        element_type: ElementType,
        metric: MetricKind,
        top_n: i64,
    ) -> Result<Self> {
        if embedding.is_empty() {
            return Err(KnnError::InvalidEmbedding("embedding is empty".to_string()));
        }
        Ok(KnnRequest {
            column: column.into(),
            embedding,
            element_type,
            metric,
            top_n,
            output: Vec::new(),
        })
    }

    /// Columns to project for each hit. `_row_id` names the row id.
    pub fn with_output<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn embedding(&self) -> &EmbeddingLiteral {
        &self.embedding
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    pub fn top_n(&self) -> i64 {
        self.top_n
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }
}

/// Which engine path answered a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPath {
    Index(String),
    BruteForce,
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchPath::Index(name) => write!(f, "index {}", name),
            SearchPath::BruteForce => write!(f, "brute force"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnnResult {
    /// Hits, best first.
    pub rows: Vec<QueryResult>,
    /// One entry per hit, holding the requested output columns in order.
    pub output: Vec<Vec<Value>>,
    pub path: SearchPath,
}

impl KnnResult {
    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|row| row.row_id).collect()
    }

    pub fn scores(&self) -> Vec<f32> {
        self.rows.iter().map(|row| row.score).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
