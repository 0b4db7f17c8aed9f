use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::contract::{ClearStrategy, TableContract, contracts};
use crate::error::{ErrorKind, EtlResult};
use crate::store::{ReplaceStats, ReportingStore};
use crate::types::{Cell, KeyValue, RowSet, TableRow};
use crate::{bail, etl_error};

/// What happens to referencing rows when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Restrict,
    SetNull,
}

/// A foreign key between two tables of the memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub references: &'static str,
    pub referenced_column: &'static str,
    pub on_delete: OnDelete,
}

/// A statement the memory store executed, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    Clear {
        table: &'static str,
        strategy: ClearStrategy,
    },
    Insert {
        table: &'static str,
        rows: usize,
    },
}

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<TableRow>,
    next_identity: i64,
}

impl MemoryTable {
    fn for_contract(contract: &TableContract) -> Self {
        let mut columns = Vec::with_capacity(contract.columns.len() + 1);
        if let Some(keys) = contract.keys {
            columns.push(keys.surrogate.to_owned());
        }
        columns.extend(contract.columns.iter().map(|column| column.name.to_owned()));

        Self {
            columns,
            rows: Vec::new(),
            next_identity: 1,
        }
    }

    fn column_index(&self, name: &str) -> EtlResult<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| {
                etl_error!(
                    ErrorKind::InvalidState,
                    "Foreign key names an unknown column",
                    name
                )
            })
    }
}

#[derive(Debug)]
struct Inner {
    tables: HashMap<&'static str, MemoryTable>,
    foreign_keys: Vec<ForeignKey>,
    operations: Vec<StoreOperation>,
}

/// In-memory reporting store used by unit tests.
///
/// Holds one table per registered contract, generates surrogate keys like an identity column
/// and enforces foreign keys, nullability and the clear strategy rules of Postgres. A failed
/// replacement leaves every table untouched.
#[derive(Debug, Clone)]
pub struct MemoryReportingStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryReportingStore {
    /// Creates an empty table for every registered contract, without foreign keys.
    pub fn new() -> Self {
        Self::with_foreign_keys(Vec::new())
    }

    /// Creates the store with the reporting schema's foreign key from the fact table to the
    /// product dimension.
    pub fn star_schema() -> Self {
        Self::with_foreign_keys(vec![ForeignKey {
            table: "Fact_OrderMetrics",
            column: "ProductKey",
            references: "Dim_Product",
            referenced_column: "ProductKey",
            on_delete: OnDelete::SetNull,
        }])
    }

    fn with_foreign_keys(foreign_keys: Vec<ForeignKey>) -> Self {
        let tables = contracts()
            .into_iter()
            .map(|contract| (contract.name, MemoryTable::for_contract(contract)))
            .collect();

        Self {
            inner: Arc::new(Mutex::new(Inner {
                tables,
                foreign_keys,
                operations: Vec::new(),
            })),
        }
    }

    pub async fn add_foreign_key(&self, foreign_key: ForeignKey) {
        let mut inner = self.inner.lock().await;
        inner.foreign_keys.push(foreign_key);
    }

    /// Returns every column of a table, generated surrogate key included.
    pub async fn table_rows(&self, table: &str) -> Option<RowSet> {
        let inner = self.inner.lock().await;
        inner.tables.get(table).map(|table| {
            RowSet::with_rows(table.columns.clone(), table.rows.clone()).unwrap_or_default()
        })
    }

    /// Statements executed so far, in order.
    pub async fn operations(&self) -> Vec<StoreOperation> {
        let inner = self.inner.lock().await;
        inner.operations.clone()
    }
}

impl Default for MemoryReportingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportingStore for MemoryReportingStore {
    async fn fetch_key_pairs(&self, contract: &'static TableContract) -> EtlResult<RowSet> {
        let Some(keys) = contract.keys else {
            bail!(ErrorKind::InvalidState, "Table has no dimension keys");
        };

        let inner = self.inner.lock().await;
        let table = table(&inner.tables, contract.name)?;
        let surrogate = table.column_index(keys.surrogate)?;
        let natural = table.column_index(keys.natural)?;

        let mut pairs = table
            .rows
            .iter()
            .map(|row| {
                TableRow::new(vec![
                    row.values()[surrogate].clone(),
                    row.values()[natural].clone(),
                ])
            })
            .collect::<Vec<_>>();
        pairs.sort_by_key(|row| {
            let key = row.values()[1].to_key_value();
            (key.is_none(), key)
        });

        RowSet::with_rows([keys.surrogate, keys.natural], pairs)
    }

    async fn replace_table(
        &self,
        contract: &'static TableContract,
        rows: RowSet,
    ) -> EtlResult<ReplaceStats> {
        contract.check_columns(&rows)?;

        let mut inner = self.inner.lock().await;

        if contract.clear_strategy == ClearStrategy::Truncate {
            let referencing = inner
                .foreign_keys
                .iter()
                .filter(|fk| fk.references == contract.name && fk.table != contract.name)
                .count();
            if referencing > 0 {
                bail!(
                    ErrorKind::ClearStrategyMismatch,
                    "Truncate requested for a table referenced by a foreign key",
                    format!(
                        "{} is referenced by {referencing} foreign key(s), use delete",
                        contract.table_name()
                    )
                );
            }
        }

        // All changes are applied to a copy that replaces the tables only on success.
        let mut tables = inner.tables.clone();
        let deleted = clear(&mut tables, &inner.foreign_keys, contract)?;
        let inserted = insert(&mut tables, &inner.foreign_keys, contract, rows)?;

        inner.tables = tables;
        inner.operations.push(StoreOperation::Clear {
            table: contract.name,
            strategy: contract.clear_strategy,
        });
        inner.operations.push(StoreOperation::Insert {
            table: contract.name,
            rows: inserted,
        });

        info!(
            table = %contract.table_name(),
            deleted,
            inserted,
            "replaced table contents"
        );

        Ok(ReplaceStats {
            deleted: deleted as u64,
            inserted: inserted as u64,
        })
    }
}

fn table<'a>(
    tables: &'a HashMap<&'static str, MemoryTable>,
    name: &str,
) -> EtlResult<&'a MemoryTable> {
    tables
        .get(name)
        .ok_or_else(|| etl_error!(ErrorKind::DestinationQueryFailed, "Table does not exist", name))
}

fn table_mut<'a>(
    tables: &'a mut HashMap<&'static str, MemoryTable>,
    name: &str,
) -> EtlResult<&'a mut MemoryTable> {
    tables
        .get_mut(name)
        .ok_or_else(|| etl_error!(ErrorKind::DestinationQueryFailed, "Table does not exist", name))
}

fn clear(
    tables: &mut HashMap<&'static str, MemoryTable>,
    foreign_keys: &[ForeignKey],
    contract: &TableContract,
) -> EtlResult<usize> {
    for fk in foreign_keys
        .iter()
        .filter(|fk| fk.references == contract.name && fk.table != contract.name)
    {
        let target = table(tables, contract.name)?;
        let referenced_index = target.column_index(fk.referenced_column)?;
        let removed_keys = target
            .rows
            .iter()
            .filter_map(|row| row.values()[referenced_index].to_key_value())
            .collect::<HashSet<KeyValue>>();

        let referencing = table_mut(tables, fk.table)?;
        let column_index = referencing.column_index(fk.column)?;
        for row in &mut referencing.rows {
            let value = &mut row.values_mut()[column_index];
            let is_referenced = value
                .to_key_value()
                .is_some_and(|key| removed_keys.contains(&key));
            if !is_referenced {
                continue;
            }

            match fk.on_delete {
                OnDelete::Restrict => bail!(
                    ErrorKind::ConstraintViolation,
                    "Delete violates a foreign key",
                    format!(
                        "{}.{} still references {}",
                        fk.table, fk.column, fk.references
                    )
                ),
                OnDelete::SetNull => *value = Cell::Null,
            }
        }
    }

    let target = table_mut(tables, contract.name)?;
    let deleted = target.rows.len();
    target.rows.clear();
    if contract.clear_strategy == ClearStrategy::Truncate {
        target.next_identity = 1;
    }

    Ok(deleted)
}

fn insert(
    tables: &mut HashMap<&'static str, MemoryTable>,
    foreign_keys: &[ForeignKey],
    contract: &TableContract,
    rows: RowSet,
) -> EtlResult<usize> {
    let outgoing = foreign_keys
        .iter()
        .filter(|fk| fk.table == contract.name)
        .map(|fk| {
            let referenced = table(tables, fk.references)?;
            let referenced_index = referenced.column_index(fk.referenced_column)?;
            let keys = referenced
                .rows
                .iter()
                .filter_map(|row| row.values()[referenced_index].to_key_value())
                .collect::<HashSet<_>>();
            Ok((fk, keys))
        })
        .collect::<EtlResult<Vec<_>>>()?;

    let target = table_mut(tables, contract.name)?;
    let mut inserted = 0;

    for row in rows.into_rows() {
        for (cell, column) in row.values().iter().zip(contract.columns) {
            if cell.is_null() && !column.nullable {
                bail!(
                    ErrorKind::ConstraintViolation,
                    "Null value in a non-nullable column",
                    format!("{}.{}", contract.name, column.name)
                );
            }
        }

        let mut values = Vec::with_capacity(target.columns.len());
        if contract.keys.is_some() {
            values.push(Cell::I64(target.next_identity));
            target.next_identity += 1;
        }
        values.extend(row.into_values());

        for (fk, keys) in &outgoing {
            let index = target.column_index(fk.column)?;
            let Some(key) = values[index].to_key_value() else {
                continue;
            };
            if !keys.contains(&key) {
                bail!(
                    ErrorKind::ConstraintViolation,
                    "Insert violates a foreign key",
                    format!(
                        "{}.{} = {key} is not present in {}",
                        fk.table, fk.column, fk.references
                    )
                );
            }
        }

        target.rows.push(TableRow::new(values));
        inserted += 1;
    }

    Ok(inserted)
}
