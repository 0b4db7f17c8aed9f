//! Builders for row sets shaped like extracted and loaded data.

use crate::contract::{DIM_CATEGORY, DIM_PRODUCT, FACT_ORDER_METRICS};
use crate::types::{Cell, RowSet, TableRow};

fn text(value: &str) -> Cell {
    Cell::String(value.to_owned())
}

/// Category rows as returned by the categories source query.
pub fn extracted_categories(categories: &[(i16, &str, &str)]) -> RowSet {
    let rows = categories
        .iter()
        .map(|(id, name, description)| {
            TableRow::new(vec![Cell::I16(*id), text(name), text(description)])
        })
        .collect();

    RowSet::with_rows(["CategoryID", "CategoryName", "Description"], rows)
        .expect("category rows match their columns")
}

/// Product rows as returned by the products source query, with fixed supplier and stock values.
pub fn extracted_products(products: &[(i16, &str, f32)]) -> RowSet {
    let rows = products
        .iter()
        .map(|(id, name, unit_price)| {
            TableRow::new(vec![
                Cell::I16(*id),
                text(name),
                Cell::I16(1),
                Cell::I16(1),
                text("12 - 1 lb pkgs"),
                Cell::F32(*unit_price),
                Cell::I16(20),
                Cell::I32(0),
            ])
        })
        .collect();

    RowSet::with_rows(
        [
            "ProductID",
            "ProductName",
            "SupplierID",
            "CategoryID",
            "QuantityPerUnit",
            "UnitPrice",
            "UnitsInStock",
            "Discontinued",
        ],
        rows,
    )
    .expect("product rows match their columns")
}

/// Order lines as returned by the order lines source query.
///
/// Each tuple is `(order_id, product_id, quantity, unit_price, discount)`.
pub fn extracted_order_lines(lines: &[(i16, i16, i16, f32, f32)]) -> RowSet {
    let order_date = chrono::NaiveDate::from_ymd_opt(1996, 7, 4).expect("valid date");
    let required_date = chrono::NaiveDate::from_ymd_opt(1996, 8, 1).expect("valid date");

    let rows = lines
        .iter()
        .map(|(order_id, product_id, quantity, unit_price, discount)| {
            TableRow::new(vec![
                Cell::I16(*order_id),
                Cell::I16(*product_id),
                Cell::Date(order_date),
                Cell::Date(required_date),
                Cell::Null,
                Cell::I16(*quantity),
                Cell::F32(*discount),
                Cell::F32(*unit_price),
            ])
        })
        .collect();

    RowSet::with_rows(
        [
            "OrderID",
            "ProductID",
            "OrderDate",
            "RequiredDate",
            "ShippedDate",
            "Quantity",
            "Discount",
            "UnitPrice",
        ],
        rows,
    )
    .expect("order lines match their columns")
}

/// Rows ready to be stored in `Dim_Category`.
pub fn category_rows(categories: &[(i32, &str, &str)]) -> RowSet {
    let rows = categories
        .iter()
        .map(|(id, name, description)| {
            TableRow::new(vec![Cell::I32(*id), text(name), text(description)])
        })
        .collect();

    RowSet::with_rows(DIM_CATEGORY.column_names(), rows).expect("category rows match the contract")
}

/// Rows ready to be stored in `Dim_Product`.
pub fn product_rows(products: &[(i32, &str)]) -> RowSet {
    let rows = products
        .iter()
        .map(|(id, name)| {
            TableRow::new(vec![
                Cell::I32(*id),
                text(name),
                Cell::Null,
                Cell::Null,
                Cell::Null,
                Cell::F64(10.0),
                Cell::I16(5),
                Cell::Bool(false),
            ])
        })
        .collect();

    RowSet::with_rows(DIM_PRODUCT.column_names(), rows).expect("product rows match the contract")
}

/// One row ready to be stored in `Fact_OrderMetrics`.
pub fn fact_row(order_id: i32, product_id: i32, product_key: Option<i64>) -> TableRow {
    let row = TableRow::new(vec![
        Cell::I32(order_id),
        Cell::I32(product_id),
        product_key.map(Cell::I64).unwrap_or(Cell::Null),
        Cell::Null,
        Cell::Null,
        Cell::Null,
        Cell::I16(1),
        Cell::F32(0.0),
        Cell::Null,
    ]);
    debug_assert_eq!(row.len(), FACT_ORDER_METRICS.columns.len());

    row
}
