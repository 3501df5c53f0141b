use super::{
    schema::{ColumnType, Value},
    ElementType,
};

/// Fixed-dimension embedding storage for one segment. Values are kept
/// contiguously; a null cell occupies zeroed space and is masked out by
/// `validity`.
#[derive(Debug, Clone)]
pub struct VectorColumn {
    dimension: usize,
    element_type: ElementType,
    data: Vec<f32>,
    validity: Vec<bool>,
}

impl VectorColumn {
    pub fn new(dimension: usize, element_type: ElementType) -> Self {
        VectorColumn {
            dimension,
            element_type,
            data: Vec::new(),
            validity: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn len(&self) -> usize {
        self.validity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validity.is_empty()
    }

    /// Appends one cell. The caller has already checked the dimension.
    pub fn push(&mut self, embedding: Option<&[f32]>) {
        match embedding {
            Some(values) => {
                debug_assert_eq!(values.len(), self.dimension);
                self.data.extend_from_slice(values);
                self.validity.push(true);
            }
            None => {
                self.data.resize(self.data.len() + self.dimension, 0.0);
                self.validity.push(false);
            }
        }
    }

    pub fn get(&self, offset: usize) -> Option<&[f32]> {
        if !*self.validity.get(offset)? {
            return None;
        }
        let start = offset * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Non-null cells with their segment offsets, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f32])> + '_ {
        self.data
            .chunks_exact(self.dimension)
            .zip(self.validity.iter())
            .enumerate()
            .filter_map(|(offset, (values, valid))| valid.then_some((offset, values)))
    }
}

/// Per-segment storage of one column.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Varchar(Vec<Option<String>>),
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Vector(VectorColumn),
}

impl ColumnData {
    pub fn for_type(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::Varchar => ColumnData::Varchar(Vec::new()),
            ColumnType::Integer => ColumnData::Integer(Vec::new()),
            ColumnType::Float => ColumnData::Float(Vec::new()),
            ColumnType::Vector {
                dimension,
                element_type,
            } => ColumnData::Vector(VectorColumn::new(*dimension, *element_type)),
        }
    }

    /// Appends a value that has already passed `ColumnType::check_value`.
    /// Mismatched values are stored as null.
    pub fn push(&mut self, value: Value) {
        match (self, value) {
            (ColumnData::Varchar(values), Value::Varchar(v)) => values.push(Some(v)),
            (ColumnData::Varchar(values), _) => values.push(None),
            (ColumnData::Integer(values), Value::Integer(v)) => values.push(Some(v)),
            (ColumnData::Integer(values), _) => values.push(None),
            (ColumnData::Float(values), Value::Float(v)) => values.push(Some(v)),
            (ColumnData::Float(values), _) => values.push(None),
            (ColumnData::Vector(column), Value::Vector(v)) => column.push(Some(v.as_slice())),
            (ColumnData::Vector(column), _) => column.push(None),
        }
    }

    pub fn value(&self, offset: usize) -> Value {
        match self {
            ColumnData::Varchar(values) => values[offset].clone().into(),
            ColumnData::Integer(values) => values[offset].into(),
            ColumnData::Float(values) => values[offset].into(),
            ColumnData::Vector(column) => column.get(offset).map(<[f32]>::to_vec).into(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Varchar(values) => values.len(),
            ColumnData::Integer(values) => values.len(),
            ColumnData::Float(values) => values.len(),
            ColumnData::Vector(column) => column.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_vector(&self) -> Option<&VectorColumn> {
        match self {
            ColumnData::Vector(column) => Some(column),
            _ => None,
        }
    }
}
