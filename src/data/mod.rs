use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{KnnError, Result},
    index::DistanceMetric,
};

pub mod column;
pub mod generator;
pub mod schema;
pub mod segment;

/// Dense embedding used by the graph index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseVector {
    pub values: Vec<f32>,
}

impl DenseVector {
    pub fn new(values: Vec<f32>) -> Self {
        DenseVector { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Ranking distance under `metric`; lower is always closer.
    pub fn distance(&self, other: &[f32], metric: DistanceMetric) -> f32 {
        metric.rank_distance(&self.values, other)
    }
}

/// Inner product of two equal-length slices.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Sum of squared differences between corresponding elements. The square
/// root is not taken: ordering is all the engine needs.
pub fn squared_euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Element type of a vector column or of a query embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::Float32 => "float",
            ElementType::Float64 => "double",
        }
    }

    /// Inclusive range for integer types.
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            ElementType::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            ElementType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            ElementType::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            ElementType::Int64 => Some((i64::MIN, i64::MAX)),
            ElementType::Float32 | ElementType::Float64 => None,
        }
    }

    /// Whether a vector column may be declared with this element type.
    pub fn is_storable(&self) -> bool {
        !matches!(self, ElementType::Int64 | ElementType::Float64)
    }

    /// Checks that `value` can be held by this element type without loss.
    pub fn accepts(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.integer_range() {
            Some((min, max)) => value.fract() == 0.0 && value >= min as f64 && value <= max as f64,
            None => match self {
                ElementType::Float32 => value.abs() <= f32::MAX as f64,
                _ => true,
            },
        }
    }
}

impl FromStr for ElementType {
    type Err = KnnError;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "int8" | "tinyint" => Ok(ElementType::Int8),
            "int16" | "smallint" => Ok(ElementType::Int16),
            "int" | "int32" | "integer" => Ok(ElementType::Int32),
            "int64" | "bigint" => Ok(ElementType::Int64),
            "float" | "float32" => Ok(ElementType::Float32),
            "double" | "float64" => Ok(ElementType::Float64),
            _ => Err(KnnError::InvalidElementType(token.to_string())),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Stable row handle: segment id in the upper 32 bits, offset inside the
/// segment in the lower 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(u64);

impl RowId {
    pub fn new(segment_id: u32, segment_offset: u32) -> Self {
        RowId(((segment_id as u64) << 32) | segment_offset as u64)
    }

    pub fn from_u64(raw: u64) -> Self {
        RowId(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn segment_id(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn segment_offset(&self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ranked hit. `score` is the metric value itself: a squared distance
/// for l2, a product for inner product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryResult {
    pub row_id: RowId,
    pub score: f32,
}
