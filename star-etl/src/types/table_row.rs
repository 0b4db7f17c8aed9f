use crate::types::Cell;

/// A row of cells, ordered like the columns of the [`crate::types::RowSet`] holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    values: Vec<Cell>,
}

impl TableRow {
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    /// Returns the row values in column order.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Returns mutable access to row values in column order.
    pub fn values_mut(&mut self) -> &mut Vec<Cell> {
        &mut self.values
    }

    /// Consumes the row and returns its values in column order.
    pub fn into_values(self) -> Vec<Cell> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Cell>> for TableRow {
    fn from(values: Vec<Cell>) -> Self {
        TableRow::new(values)
    }
}
