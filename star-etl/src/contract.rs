//! Registry of reporting tables and the statements generated from them.
//!
//! Every statement sent to the reporting store is derived from a [`TableContract`], so table and
//! column names are always quoted the same way and values always travel as bind parameters.

use pg_escape::quote_identifier;
use star_postgres::types::TableName;
use std::fmt;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::{Cell, ColumnType, RowSet, TableRow};

/// Schema holding the reporting tables.
pub const REPORTING_SCHEMA: &str = "public";

/// Highest number of bind parameters Postgres accepts in one statement.
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// How a table is emptied before it is reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearStrategy {
    /// `truncate ... restart identity`. Only valid for tables no foreign key points at.
    Truncate,
    /// Row-by-row `delete`. Required for tables referenced by a foreign key.
    Delete,
}

impl ClearStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClearStrategy::Truncate => "truncate",
            ClearStrategy::Delete => "delete",
        }
    }
}

impl fmt::Display for ClearStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded column of a reporting table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name,
            column_type,
            nullable,
        }
    }
}

/// Key columns of a dimension table.
///
/// The surrogate column is generated by the reporting store and never part of the loaded
/// columns; the natural column is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionKeys {
    pub surrogate: &'static str,
    pub natural: &'static str,
}

/// Name, loaded columns and clear strategy of one reporting table.
#[derive(Debug, PartialEq, Eq)]
pub struct TableContract {
    pub schema: &'static str,
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    pub clear_strategy: ClearStrategy,
    pub keys: Option<DimensionKeys>,
}

impl TableContract {
    pub fn table_name(&self) -> TableName {
        TableName::new(self.schema, self.name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Statement that empties the table according to its clear strategy.
    pub fn clear_sql(&self) -> String {
        let table = self.table_name().as_quoted_identifier();
        match self.clear_strategy {
            ClearStrategy::Truncate => format!("truncate table {table} restart identity"),
            ClearStrategy::Delete => format!("delete from {table}"),
        }
    }

    pub fn count_sql(&self) -> String {
        format!(
            "select count(*) from {}",
            self.table_name().as_quoted_identifier()
        )
    }

    /// Multi-row insert with one placeholder per value.
    ///
    /// Numeric placeholders carry an explicit cast so that `NaN` and the infinities can be bound
    /// as text.
    pub fn insert_sql(&self, row_count: usize) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| quote_identifier(column.name).into_owned())
            .collect::<Vec<_>>()
            .join(", ");

        let mut parameter = 0;
        let values = (0..row_count)
            .map(|_| {
                let placeholders = self
                    .columns
                    .iter()
                    .map(|column| {
                        parameter += 1;
                        match column.column_type {
                            ColumnType::Numeric => format!("${parameter}::numeric"),
                            _ => format!("${parameter}"),
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({placeholders})")
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "insert into {} ({columns}) values {values}",
            self.table_name().as_quoted_identifier()
        )
    }

    /// Number of rows sent per insert statement.
    ///
    /// Bounded by the configured batch size and by the bind parameter limit.
    pub fn rows_per_statement(&self, batch_size: usize) -> usize {
        let by_parameters = MAX_BIND_PARAMETERS / self.columns.len().max(1);
        batch_size.min(by_parameters).max(1)
    }

    /// Query returning `(surrogate, natural)` pairs ordered by natural key.
    ///
    /// Fails with [`ErrorKind::InvalidState`] for tables without dimension keys.
    pub fn key_pairs_sql(&self) -> EtlResult<String> {
        let Some(keys) = self.keys else {
            bail!(
                ErrorKind::InvalidState,
                "Table has no dimension keys",
                self.table_name()
            );
        };

        Ok(format!(
            "select {surrogate}, {natural} from {table} order by {natural}",
            surrogate = quote_identifier(keys.surrogate),
            natural = quote_identifier(keys.natural),
            table = self.table_name().as_quoted_identifier()
        ))
    }

    /// Checks that `row_set` has exactly the contract columns, in contract order.
    pub fn check_columns(&self, row_set: &RowSet) -> EtlResult<()> {
        let expected = self.column_names();
        if row_set.columns().len() != expected.len()
            || row_set
                .columns()
                .iter()
                .zip(expected.iter())
                .any(|(actual, expected)| actual != expected)
        {
            bail!(
                ErrorKind::ContractViolation,
                "Column set does not match the table contract",
                format!(
                    "{} expects {} columns {:?}, got {} columns {:?}",
                    self.table_name(),
                    expected.len(),
                    expected,
                    row_set.columns().len(),
                    row_set.columns()
                )
            );
        }

        Ok(())
    }

    /// Converts every cell into the representation of its column type.
    pub fn conform(&self, row_set: RowSet) -> EtlResult<RowSet> {
        self.check_columns(&row_set)?;

        let columns = self.column_names();
        let rows = row_set
            .into_rows()
            .into_iter()
            .map(|row| {
                let values = row
                    .into_values()
                    .into_iter()
                    .zip(self.columns.iter())
                    .map(|(cell, column)| cell.conform(column.column_type))
                    .collect::<EtlResult<Vec<Cell>>>()?;
                Ok(TableRow::new(values))
            })
            .collect::<EtlResult<Vec<_>>>()?;

        RowSet::with_rows(columns, rows)
    }
}

pub static DIM_CATEGORY: TableContract = TableContract {
    schema: REPORTING_SCHEMA,
    name: "Dim_Category",
    columns: &[
        ColumnSpec::new("Source_CategoryID", ColumnType::Int4, false),
        ColumnSpec::new("CategoryName", ColumnType::Text, false),
        ColumnSpec::new("CategoryDescription", ColumnType::Text, true),
    ],
    clear_strategy: ClearStrategy::Truncate,
    keys: Some(DimensionKeys {
        surrogate: "CategoryKey",
        natural: "Source_CategoryID",
    }),
};

pub static DIM_PRODUCT: TableContract = TableContract {
    schema: REPORTING_SCHEMA,
    name: "Dim_Product",
    columns: &[
        ColumnSpec::new("Source_ProductID", ColumnType::Int4, false),
        ColumnSpec::new("ProductName", ColumnType::Text, false),
        ColumnSpec::new("Source_SupplierID", ColumnType::Int4, true),
        ColumnSpec::new("Source_CategoryID", ColumnType::Int4, true),
        ColumnSpec::new("QuantityPerUnit", ColumnType::Text, true),
        ColumnSpec::new("UnitPrice", ColumnType::Float8, true),
        ColumnSpec::new("UnitsInStock", ColumnType::Int2, true),
        ColumnSpec::new("Discontinued", ColumnType::Bool, false),
    ],
    // Fact_OrderMetrics references this table.
    clear_strategy: ClearStrategy::Delete,
    keys: Some(DimensionKeys {
        surrogate: "ProductKey",
        natural: "Source_ProductID",
    }),
};

pub static FACT_ORDER_METRICS: TableContract = TableContract {
    schema: REPORTING_SCHEMA,
    name: "Fact_OrderMetrics",
    columns: &[
        ColumnSpec::new("Source_OrderID", ColumnType::Int4, false),
        ColumnSpec::new("Source_ProductID", ColumnType::Int4, false),
        ColumnSpec::new("ProductKey", ColumnType::Int8, true),
        ColumnSpec::new("OrderDate", ColumnType::Date, true),
        ColumnSpec::new("RequiredDate", ColumnType::Date, true),
        ColumnSpec::new("ShippedDate", ColumnType::Date, true),
        ColumnSpec::new("Quantity", ColumnType::Int2, false),
        ColumnSpec::new("Discount", ColumnType::Float4, false),
        ColumnSpec::new("ExtendedPrice", ColumnType::Numeric, true),
    ],
    clear_strategy: ClearStrategy::Delete,
    keys: None,
};

/// All registered contracts, dimensions first.
pub fn contracts() -> [&'static TableContract; 3] {
    [&DIM_CATEGORY, &DIM_PRODUCT, &FACT_ORDER_METRICS]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_statements_follow_strategy() {
        insta::assert_snapshot!(DIM_CATEGORY.clear_sql(), @r#"truncate table public."Dim_Category" restart identity"#);
        insta::assert_snapshot!(DIM_PRODUCT.clear_sql(), @r#"delete from public."Dim_Product""#);
        insta::assert_snapshot!(FACT_ORDER_METRICS.clear_sql(), @r#"delete from public."Fact_OrderMetrics""#);
    }

    #[test]
    fn insert_statement_numbers_parameters_across_rows() {
        insta::assert_snapshot!(
            DIM_CATEGORY.insert_sql(2),
            @r#"insert into public."Dim_Category" ("Source_CategoryID", "CategoryName", "CategoryDescription") values ($1, $2, $3), ($4, $5, $6)"#
        );
    }

    #[test]
    fn numeric_placeholders_are_cast() {
        let sql = FACT_ORDER_METRICS.insert_sql(1);

        assert!(sql.ends_with("$7, $8, $9::numeric)"));
    }

    #[test]
    fn key_pairs_query_orders_by_natural_key() {
        insta::assert_snapshot!(
            DIM_PRODUCT.key_pairs_sql().unwrap(),
            @r#"select "ProductKey", "Source_ProductID" from public."Dim_Product" order by "Source_ProductID""#
        );

        let err = FACT_ORDER_METRICS.key_pairs_sql().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn fact_contract_has_nine_columns_in_order() {
        assert_eq!(
            FACT_ORDER_METRICS.column_names(),
            [
                "Source_OrderID",
                "Source_ProductID",
                "ProductKey",
                "OrderDate",
                "RequiredDate",
                "ShippedDate",
                "Quantity",
                "Discount",
                "ExtendedPrice",
            ]
        );
    }

    #[test]
    fn statements_stay_under_the_parameter_limit() {
        assert_eq!(FACT_ORDER_METRICS.rows_per_statement(1000), 1000);
        assert_eq!(FACT_ORDER_METRICS.rows_per_statement(100_000), 65_535 / 9);
        assert_eq!(DIM_CATEGORY.rows_per_statement(0), 1);
    }

    #[test]
    fn column_check_rejects_reordered_columns() {
        let row_set = RowSet::new(["CategoryName", "Source_CategoryID", "CategoryDescription"]);

        let err = DIM_CATEGORY.check_columns(&row_set).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn referenced_dimension_uses_delete() {
        assert_eq!(DIM_PRODUCT.clear_strategy, ClearStrategy::Delete);
        assert_eq!(DIM_CATEGORY.clear_strategy, ClearStrategy::Truncate);
    }
}
