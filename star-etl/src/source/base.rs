use std::future::Future;

use crate::error::EtlResult;
use crate::types::RowSet;

/// A named read-only query against the transactional store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceQuery {
    /// Stable name used in logs and by [`crate::source::memory::MemorySource`].
    pub name: &'static str,
    pub sql: &'static str,
}

/// Read-only access to the transactional store.
///
/// Implementations must never modify the store. A query that legitimately matches nothing
/// returns an empty [`RowSet`]; every failure is returned as an error.
pub trait Source {
    /// Runs `query` and returns its columns and rows.
    fn query(&self, query: &SourceQuery) -> impl Future<Output = EtlResult<RowSet>> + Send;
}
