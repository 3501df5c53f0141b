use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::error::{KnnError, Result};

use super::ElementType;

/// Pseudo column that projects the row identifier.
pub const ROW_ID_COLUMN: &str = "_row_id";

pub type ColumnId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Varchar,
    Integer,
    Float,
    Vector {
        dimension: usize,
        element_type: ElementType,
    },
}

impl ColumnType {
    pub fn is_vector(&self) -> bool {
        matches!(self, ColumnType::Vector { .. })
    }

    /// Rejects values that do not fit this column. Null is always allowed.
    pub fn check_value(&self, column: &str, value: &Value) -> Result<()> {
        match (self, value) {
            (_, Value::Null)
            | (ColumnType::Varchar, Value::Varchar(_))
            | (ColumnType::Integer, Value::Integer(_))
            | (ColumnType::Float, Value::Float(_)) => Ok(()),
            (ColumnType::Float, Value::Integer(_)) => Ok(()),
            (
                ColumnType::Vector {
                    dimension,
                    element_type,
                },
                Value::Vector(values),
            ) => {
                if values.len() != *dimension {
                    return Err(KnnError::InvalidRow(format!(
                        "column {} expects {} values, got {}",
                        column,
                        dimension,
                        values.len()
                    )));
                }
                if let Some(bad) = values.iter().find(|v| !element_type.accepts(**v as f64)) {
                    return Err(KnnError::InvalidRow(format!(
                        "column {} cannot hold {} as {}",
                        column, bad, element_type
                    )));
                }
                Ok(())
            }
            _ => Err(KnnError::InvalidRow(format!(
                "column {} of type {} cannot hold {:?}",
                column, self, value
            ))),
        }
    }
}

/// Parses the type spellings used by table definitions, e.g. `varchar`,
/// `float` or `vector,4,float`.
impl FromStr for ColumnType {
    type Err = KnnError;

    fn from_str(spec: &str) -> Result<Self> {
        let lowered = spec.trim().to_ascii_lowercase();
        let parts: Vec<&str> = lowered.split(',').map(str::trim).collect();
        match parts.as_slice() {
            ["varchar"] | ["string"] | ["text"] => Ok(ColumnType::Varchar),
            ["int"] | ["integer"] | ["int32"] | ["int64"] | ["bigint"] => Ok(ColumnType::Integer),
            ["float"] | ["float32"] | ["double"] | ["float64"] => Ok(ColumnType::Float),
            ["vector", dimension, element] => {
                let dimension: usize = dimension.parse().map_err(|_| {
                    KnnError::InvalidArgument(format!("invalid vector dimension in {}", spec))
                })?;
                if dimension == 0 {
                    return Err(KnnError::InvalidArgument(format!(
                        "vector dimension must be positive in {}",
                        spec
                    )));
                }
                let element_type: ElementType = element.parse()?;
                if !element_type.is_storable() {
                    return Err(KnnError::NotSupported(format!(
                        "vector column with {} elements",
                        element_type
                    )));
                }
                Ok(ColumnType::Vector {
                    dimension,
                    element_type,
                })
            }
            _ => Err(KnnError::InvalidArgument(format!(
                "unknown column type: {}",
                spec
            ))),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Varchar => write!(f, "varchar"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Vector {
                dimension,
                element_type,
            } => write!(f, "vector,{},{}", dimension, element_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnDef {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        if columns.is_empty() {
            return Err(KnnError::InvalidArgument(
                "a table needs at least one column".to_string(),
            ));
        }
        for (i, column) in columns.iter().enumerate() {
            if column.name.is_empty() || column.name == ROW_ID_COLUMN {
                return Err(KnnError::InvalidArgument(format!(
                    "invalid column name: {:?}",
                    column.name
                )));
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(KnnError::InvalidArgument(format!(
                    "duplicate column name: {}",
                    column.name
                )));
            }
        }
        Ok(TableSchema { columns })
    }

    /// Builds a schema from `(name, type spec)` pairs.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self> {
        let columns = pairs
            .iter()
            .map(|(name, spec)| Ok(ColumnDef::new(*name, spec.parse()?)))
            .collect::<Result<Vec<_>>>()?;
        TableSchema::new(columns)
    }

    pub fn column(&self, name: &str) -> Option<(ColumnId, &ColumnDef)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.name == name)
    }

    pub fn column_by_id(&self, id: ColumnId) -> &ColumnDef {
        &self.columns[id]
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Orders a row's values by column position and type-checks every
    /// value. A row must name every column; missing cells are written as
    /// an explicit [`Value::Null`].
    pub fn arrange(&self, row: Row) -> Result<Vec<Value>> {
        if row.values.len() != self.columns.len() {
            if let Some(name) = row.values.keys().find(|name| self.column(name).is_none()) {
                return Err(KnnError::ColumnNotFound(name.clone()));
            }
            return Err(KnnError::InvalidRow(format!(
                "value count mismatch: table has {} columns, row has {}",
                self.columns.len(),
                row.values.len()
            )));
        }

        let mut values = vec![Value::Null; self.columns.len()];
        for (name, value) in row.values {
            let (id, column) = self
                .column(&name)
                .ok_or_else(|| KnnError::ColumnNotFound(name.clone()))?;
            column.column_type.check_value(&name, &value)?;
            values[id] = match (column.column_type, value) {
                (ColumnType::Float, Value::Integer(v)) => Value::Float(v as f64),
                (_, value) => value,
            };
        }
        Ok(values)
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Varchar(String),
    Integer(i64),
    Float(f64),
    Vector(Vec<f32>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Varchar(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<f32>> for Value {
    fn from(value: Vec<f32>) -> Self {
        Value::Vector(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Column name to value mapping for one inserted row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_types() {
        assert_eq!("varchar".parse::<ColumnType>().unwrap(), ColumnType::Varchar);
        assert_eq!("float".parse::<ColumnType>().unwrap(), ColumnType::Float);
        assert_eq!(
            "vector,4,float".parse::<ColumnType>().unwrap(),
            ColumnType::Vector {
                dimension: 4,
                element_type: ElementType::Float32
            }
        );
        assert_eq!(
            "vector, 8, int8".parse::<ColumnType>().unwrap(),
            ColumnType::Vector {
                dimension: 8,
                element_type: ElementType::Int8
            }
        );
    }

    #[test]
    fn test_parse_invalid_column_types() {
        assert!("vector,0,float".parse::<ColumnType>().is_err());
        assert!("vector,four,float".parse::<ColumnType>().is_err());
        assert!("blob".parse::<ColumnType>().is_err());

        let error = "vector,4,double".parse::<ColumnType>().unwrap_err();
        assert_eq!(error.code(), crate::error::ERR_NOT_SUPPORTED);
    }

    #[test]
    fn test_schema_rejects_duplicates_and_reserved_names() {
        assert!(TableSchema::from_pairs(&[("a", "varchar"), ("a", "float")]).is_err());
        assert!(TableSchema::from_pairs(&[(ROW_ID_COLUMN, "integer")]).is_err());
        assert!(TableSchema::from_pairs(&[]).is_err());
    }

    #[test]
    fn test_arrange_orders_values_and_checks_types() {
        let schema =
            TableSchema::from_pairs(&[("name", "varchar"), ("v", "vector,2,float"), ("p", "float")])
                .unwrap();
        let row = |v: Value, name: Value| Row::new().with("name", name).with("v", v).with("p", 3i64);

        let values = schema
            .arrange(row(Value::from(vec![1.0f32, 2.0]), Value::Null))
            .unwrap();
        assert_eq!(
            values,
            vec![Value::Null, Value::Vector(vec![1.0, 2.0]), Value::Float(3.0)]
        );

        assert!(schema.arrange(row(Value::from(vec![1.0f32]), Value::from("a"))).is_err());
        assert!(schema.arrange(row(Value::Null, Value::Float(1.0))).is_err());
        assert!(matches!(
            schema.arrange(Row::new().with("missing", 1i64)),
            Err(KnnError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_arrange_rejects_omitted_columns() {
        let schema =
            TableSchema::from_pairs(&[("name", "varchar"), ("v", "vector,2,float")]).unwrap();

        let error = schema
            .arrange(Row::new().with("v", vec![1.0f32, 2.0]))
            .unwrap_err();
        assert!(matches!(error, KnnError::InvalidRow(_)));
        assert!(error.to_string().contains("value count mismatch"));

        let values = schema
            .arrange(Row::new().with("name", Value::Null).with("v", vec![1.0f32, 2.0]))
            .unwrap();
        assert_eq!(values[0], Value::Null);
    }

    #[test]
    fn test_integer_vector_column_rejects_fractions() {
        let schema = TableSchema::from_pairs(&[("v", "vector,2,int8")]).unwrap();
        assert!(schema.arrange(Row::new().with("v", vec![1.0f32, 2.0])).is_ok());
        assert!(schema.arrange(Row::new().with("v", vec![1.5f32, 2.0])).is_err());
        assert!(schema.arrange(Row::new().with("v", vec![300.0f32, 2.0])).is_err());
    }
}
