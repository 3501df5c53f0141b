use super::{
    column::{ColumnData, VectorColumn},
    schema::{ColumnId, TableSchema, Value},
    RowId,
};

/// Append-only block of rows. Row ids inside a segment are
/// `RowId::new(id, offset)` with offsets assigned in insertion order.
#[derive(Debug, Clone)]
pub struct Segment {
    id: u32,
    capacity: u32,
    row_count: u32,
    columns: Vec<ColumnData>,
}

impl Segment {
    pub fn new(id: u32, capacity: u32, schema: &TableSchema) -> Self {
        Segment {
            id,
            capacity,
            row_count: 0,
            columns: schema
                .columns()
                .iter()
                .map(|column| ColumnData::for_type(&column.column_type))
                .collect(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn is_full(&self) -> bool {
        self.row_count >= self.capacity
    }

    /// Appends one row whose values are in schema order and already checked.
    pub fn append(&mut self, values: Vec<Value>) -> RowId {
        debug_assert!(!self.is_full());
        debug_assert_eq!(values.len(), self.columns.len());
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
        let row_id = RowId::new(self.id, self.row_count);
        self.row_count += 1;
        row_id
    }

    pub fn vector_column(&self, column_id: ColumnId) -> Option<&VectorColumn> {
        self.columns.get(column_id)?.as_vector()
    }

    pub fn value(&self, column_id: ColumnId, offset: u32) -> Value {
        self.columns[column_id].value(offset as usize)
    }
}
