use std::future::Future;

use crate::contract::TableContract;
use crate::error::EtlResult;
use crate::types::RowSet;

/// Row counts of a completed table replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceStats {
    /// Rows present before the clear.
    pub deleted: u64,
    /// Rows inserted after the clear.
    pub inserted: u64,
}

/// Read and write access to the reporting store.
pub trait ReportingStore {
    /// Returns the `(surrogate, natural)` key pairs of a dimension table, ordered by natural key.
    fn fetch_key_pairs(
        &self,
        contract: &'static TableContract,
    ) -> impl Future<Output = EtlResult<RowSet>> + Send;

    /// Atomically replaces the contents of the table described by `contract` with `rows`.
    ///
    /// `rows` must already match the contract's columns. The clear and every insert belong to
    /// one transaction: on failure the table is left exactly as it was. Implementations must
    /// refuse a [`crate::contract::ClearStrategy::Truncate`] clear of a table that a foreign
    /// key references, with [`crate::error::ErrorKind::ClearStrategyMismatch`].
    fn replace_table(
        &self,
        contract: &'static TableContract,
        rows: RowSet,
    ) -> impl Future<Output = EtlResult<ReplaceStats>> + Send;
}
