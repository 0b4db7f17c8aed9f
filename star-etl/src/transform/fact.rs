use bigdecimal::BigDecimal;

use crate::bail;
use crate::contract::FACT_ORDER_METRICS;
use crate::error::{ErrorKind, EtlResult};
use crate::resolver::DimensionKeyMap;
use crate::types::{Cell, PgNumeric, RowSet, TableRow};

/// Result of the order metrics transform.
#[derive(Debug, Clone, PartialEq)]
pub struct FactTransform {
    /// Rows in the `Fact_OrderMetrics` column order.
    pub rows: RowSet,
    /// Number of rows whose product had no surrogate key.
    pub unresolved: usize,
}

/// Turns extracted order lines into `Fact_OrderMetrics` rows.
///
/// Computes `ExtendedPrice = Quantity * UnitPrice * (1 - Discount)` with exact decimals, looks
/// up `ProductKey` by `ProductID` in `products` and renames the source identifiers. A product
/// without a surrogate key gets a null `ProductKey` and the row is kept. The input column order
/// does not matter; the output always has the nine contract columns in contract order.
pub fn transform_order_metrics(
    mut rows: RowSet,
    products: &DimensionKeyMap,
) -> EtlResult<FactTransform> {
    let row_count = rows.len();

    let quantity = rows.require_column("Quantity")?;
    let unit_price = rows.require_column("UnitPrice")?;
    let discount = rows.require_column("Discount")?;
    rows.push_column("ExtendedPrice", |row| {
        extended_price(row, [quantity, unit_price, discount])
    })?;
    rows.drop_column("UnitPrice")?;

    let product_id = rows.require_column("ProductID")?;
    let mut unresolved = 0;
    rows.push_column("ProductKey", |row| {
        let surrogate = row.values()[product_id]
            .to_key_value()
            .and_then(|natural| products.get(&natural));

        Ok(match surrogate {
            Some(surrogate) => Cell::I64(surrogate),
            None => {
                unresolved += 1;
                Cell::Null
            }
        })
    })?;

    rows.rename(&[
        ("OrderID", "Source_OrderID"),
        ("ProductID", "Source_ProductID"),
    ])?;
    let rows = rows.project(&FACT_ORDER_METRICS.column_names())?;

    if rows.len() != row_count {
        bail!(
            ErrorKind::ContractViolation,
            "Fact row count changed during the transform",
            format!("{row_count} rows extracted, {} rows transformed", rows.len())
        );
    }
    FACT_ORDER_METRICS.check_columns(&rows)?;

    Ok(FactTransform { rows, unresolved })
}

/// Computes the extended price from the cells at `[quantity, unit_price, discount]`.
fn extended_price(row: &TableRow, indices: [usize; 3]) -> EtlResult<Cell> {
    let inputs = indices.map(|index| &row.values()[index]);
    if inputs.iter().any(|cell| cell.is_null()) {
        return Ok(Cell::Null);
    }

    let decimals = inputs
        .iter()
        .map(|cell| cell.to_decimal())
        .collect::<Option<Vec<BigDecimal>>>();
    let Some([quantity, unit_price, discount]) = decimals.and_then(|d| <[_; 3]>::try_from(d).ok())
    else {
        bail!(
            ErrorKind::ConversionError,
            "Extended price inputs are not finite numbers",
            format!(
                "quantity {:?}, unit price {:?}, discount {:?}",
                inputs[0], inputs[1], inputs[2]
            )
        );
    };

    let price = quantity * unit_price * (BigDecimal::from(1) - discount);

    Ok(Cell::Numeric(PgNumeric::Value(price.normalized())))
}
