use crate::contract::{DIM_CATEGORY, DIM_PRODUCT};
use crate::error::EtlResult;
use crate::types::{Cell, RowSet};

/// Renames the extracted category columns and projects them onto `Dim_Category`.
pub fn transform_category(mut rows: RowSet) -> EtlResult<RowSet> {
    rows.rename(&[
        ("CategoryID", "Source_CategoryID"),
        ("Description", "CategoryDescription"),
    ])?;

    rows.project(&DIM_CATEGORY.column_names())
}

/// Renames the extracted product columns, coerces the identifier and price columns and projects
/// them onto `Dim_Product`.
///
/// Values that cannot be read as a number become null instead of failing the build.
pub fn transform_product(mut rows: RowSet) -> EtlResult<RowSet> {
    rows.rename(&[
        ("ProductID", "Source_ProductID"),
        ("SupplierID", "Source_SupplierID"),
        ("CategoryID", "Source_CategoryID"),
    ])?;
    rows.map_column("Source_ProductID", |cell| {
        cell.to_i64().map(Cell::I64).unwrap_or(Cell::Null)
    })?;
    rows.map_column("UnitPrice", |cell| {
        cell.to_f64().map(Cell::F64).unwrap_or(Cell::Null)
    })?;

    rows.project(&DIM_PRODUCT.column_names())
}
