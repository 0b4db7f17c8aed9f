use tracing::info;

use crate::contract::TableContract;
use crate::error::EtlResult;
use crate::store::ReportingStore;
use crate::types::RowSet;

/// What a load did to its target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The table contents were replaced in one transaction.
    Replaced { deleted: u64, inserted: u64 },
    /// Nothing was loaded and the table was left untouched because there were no rows.
    SkippedEmpty,
}

impl LoadOutcome {
    pub fn inserted(&self) -> u64 {
        match self {
            LoadOutcome::Replaced { inserted, .. } => *inserted,
            LoadOutcome::SkippedEmpty => 0,
        }
    }
}

/// Replaces the contents of the table described by `contract` with `rows`.
///
/// An empty row set is a no-op: no clear and no insert are issued. Otherwise the rows are
/// converted to the column types of the contract before anything is sent, so a conversion
/// failure leaves the table as it was.
pub async fn load_table<D>(
    store: &D,
    contract: &'static TableContract,
    rows: RowSet,
) -> EtlResult<LoadOutcome>
where
    D: ReportingStore,
{
    if rows.is_empty() {
        info!(
            table = %contract.table_name(),
            "no rows to load, leaving the table untouched"
        );

        return Ok(LoadOutcome::SkippedEmpty);
    }

    let rows = contract.conform(rows)?;
    let stats = store.replace_table(contract, rows).await?;

    Ok(LoadOutcome::Replaced {
        deleted: stats.deleted,
        inserted: stats.inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{DIM_CATEGORY, FACT_ORDER_METRICS};
    use crate::error::ErrorKind;
    use crate::store::memory::{MemoryReportingStore, StoreOperation};
    use crate::test_utils::rows::category_rows;
    use crate::types::{Cell, TableRow};

    #[tokio::test]
    async fn empty_rows_leave_the_table_untouched() {
        let store = MemoryReportingStore::new();
        load_table(&store, &DIM_CATEGORY, category_rows(&[(1, "Beverages", "desc1")]))
            .await
            .unwrap();
        let before = store.table_rows("Dim_Category").await.unwrap();
        let operations = store.operations().await.len();

        let outcome = load_table(&store, &DIM_CATEGORY, RowSet::new(DIM_CATEGORY.column_names()))
            .await
            .unwrap();

        assert_eq!(outcome, LoadOutcome::SkippedEmpty);
        assert_eq!(store.table_rows("Dim_Category").await.unwrap(), before);
        assert_eq!(store.operations().await.len(), operations);
    }

    #[tokio::test]
    async fn rows_are_converted_to_column_types() {
        let store = MemoryReportingStore::new();
        let rows = RowSet::with_rows(
            DIM_CATEGORY.column_names(),
            vec![TableRow::new(vec![
                Cell::I16(1),
                Cell::String("Beverages".to_owned()),
                Cell::Null,
            ])],
        )
        .unwrap();

        let outcome = load_table(&store, &DIM_CATEGORY, rows).await.unwrap();

        assert_eq!(
            outcome,
            LoadOutcome::Replaced {
                deleted: 0,
                inserted: 1
            }
        );
        let stored = store.table_rows("Dim_Category").await.unwrap();
        assert_eq!(stored.rows()[0].values()[1], Cell::I32(1));
        assert_eq!(
            store.operations().await,
            [
                StoreOperation::Clear {
                    table: "Dim_Category",
                    strategy: DIM_CATEGORY.clear_strategy
                },
                StoreOperation::Insert {
                    table: "Dim_Category",
                    rows: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn malformed_rows_are_refused_before_the_store_is_touched() {
        let store = MemoryReportingStore::new();
        let rows = category_rows(&[(1, "Beverages", "desc1")]);

        let err = load_table(&store, &FACT_ORDER_METRICS, rows)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ContractViolation);
        assert!(store.operations().await.is_empty());
    }
}
