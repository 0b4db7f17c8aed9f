use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::types::{Cell, TableRow};

/// Tabular result: ordered column names and rows of matching width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl RowSet {
    /// Creates an empty result with the given columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Creates a result from columns and rows, checking that every row has one cell per column.
    pub fn with_rows<I, S>(columns: I, rows: Vec<TableRow>) -> EtlResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row_set = RowSet::new(columns);
        row_set.rows.reserve(rows.len());
        for row in rows {
            row_set.push_row(row)?;
        }

        Ok(row_set)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<TableRow> {
        self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, failing with [`ErrorKind::InvalidData`] when its width is wrong.
    pub fn push_row(&mut self, row: TableRow) -> EtlResult<()> {
        if row.len() != self.columns.len() {
            bail!(
                ErrorKind::InvalidData,
                "Row width does not match the column count",
                format!(
                    "row has {} values but the result has {} columns",
                    row.len(),
                    self.columns.len()
                )
            );
        }

        self.rows.push(row);

        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Returns the index of `name`, failing with [`ErrorKind::ContractViolation`] when absent.
    pub fn require_column(&self, name: &str) -> EtlResult<usize> {
        self.column_index(name).ok_or_else(|| {
            etl_error!(
                ErrorKind::ContractViolation,
                "Expected column is missing",
                format!("column `{name}` not found in {:?}", self.columns)
            )
        })
    }

    /// Renames columns in place. Every source column must exist and no target may collide.
    pub fn rename(&mut self, renames: &[(&str, &str)]) -> EtlResult<()> {
        for (from, to) in renames {
            let index = self.require_column(from)?;
            if self.column_index(to).is_some_and(|existing| existing != index) {
                bail!(
                    ErrorKind::ContractViolation,
                    "Renamed column already exists",
                    format!("cannot rename `{from}` to `{to}`")
                );
            }
            self.columns[index] = (*to).to_owned();
        }

        Ok(())
    }

    /// Appends a column whose value is computed from each row.
    pub fn push_column<F>(&mut self, name: &str, mut compute: F) -> EtlResult<()>
    where
        F: FnMut(&TableRow) -> EtlResult<Cell>,
    {
        if self.column_index(name).is_some() {
            bail!(
                ErrorKind::ContractViolation,
                "Derived column already exists",
                format!("column `{name}` is already present")
            );
        }

        for row in &mut self.rows {
            let cell = compute(row)?;
            row.values_mut().push(cell);
        }
        self.columns.push(name.to_owned());

        Ok(())
    }

    /// Replaces every value of one column.
    pub fn map_column<F>(&mut self, name: &str, mut map: F) -> EtlResult<()>
    where
        F: FnMut(Cell) -> Cell,
    {
        let index = self.require_column(name)?;
        for row in &mut self.rows {
            let cell = std::mem::replace(&mut row.values_mut()[index], Cell::Null);
            row.values_mut()[index] = map(cell);
        }

        Ok(())
    }

    /// Removes a column.
    pub fn drop_column(&mut self, name: &str) -> EtlResult<()> {
        let index = self.require_column(name)?;
        self.columns.remove(index);
        for row in &mut self.rows {
            row.values_mut().remove(index);
        }

        Ok(())
    }

    /// Keeps exactly `names`, in that order.
    pub fn project(self, names: &[&str]) -> EtlResult<RowSet> {
        let indices = names
            .iter()
            .map(|name| self.require_column(name))
            .collect::<EtlResult<Vec<_>>>()?;

        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                let mut values = row.into_values();
                let projected = indices
                    .iter()
                    .map(|&index| std::mem::replace(&mut values[index], Cell::Null))
                    .collect::<Vec<_>>();
                TableRow::new(projected)
            })
            .collect();

        Ok(RowSet {
            columns: names.iter().map(|name| (*name).to_owned()).collect(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowSet {
        RowSet::with_rows(
            ["a", "b", "c"],
            vec![
                TableRow::new(vec![Cell::I32(1), Cell::String("x".into()), Cell::Null]),
                TableRow::new(vec![Cell::I32(2), Cell::String("y".into()), Cell::Bool(true)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_rows_of_wrong_width() {
        let err = RowSet::with_rows(["a"], vec![TableRow::new(vec![Cell::Null, Cell::Null])])
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn projection_reorders_and_drops() {
        let projected = sample().project(&["c", "a"]).unwrap();

        assert_eq!(projected.columns(), ["c", "a"]);
        assert_eq!(
            projected.rows()[1].values(),
            [Cell::Bool(true), Cell::I32(2)]
        );
    }

    #[test]
    fn projection_fails_on_missing_column() {
        let err = sample().project(&["a", "z"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn rename_refuses_collisions() {
        let mut row_set = sample();
        row_set.rename(&[("a", "id")]).unwrap();
        assert_eq!(row_set.columns(), ["id", "b", "c"]);

        let err = row_set.rename(&[("b", "c")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn derived_columns_are_appended() {
        let mut row_set = sample();
        row_set
            .push_column("double", |row| {
                Ok(Cell::I64(row.values()[0].to_i64().unwrap_or_default() * 2))
            })
            .unwrap();
        row_set.drop_column("b").unwrap();

        assert_eq!(row_set.columns(), ["a", "c", "double"]);
        assert_eq!(row_set.rows()[1].values()[2], Cell::I64(4));
    }
}
