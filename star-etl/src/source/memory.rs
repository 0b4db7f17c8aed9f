use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::source::{Source, SourceQuery};
use crate::types::RowSet;

#[derive(Debug)]
enum CannedResult {
    Rows(RowSet),
    Failure(ErrorKind),
}

#[derive(Debug, Default)]
struct Inner {
    results: HashMap<String, CannedResult>,
    executed: Vec<String>,
}

/// In-memory source answering queries by name with canned results.
///
/// Used by unit tests. Clones share the same canned results, so a test can keep a
/// handle and change the data between two runs of a pipeline that owns another clone.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers the query named `query_name` with `rows` from now on.
    pub async fn set_rows(&self, query_name: &str, rows: RowSet) {
        let mut inner = self.inner.lock().await;
        inner
            .results
            .insert(query_name.to_owned(), CannedResult::Rows(rows));
    }

    /// Makes the query named `query_name` fail with `kind` from now on.
    pub async fn fail_query(&self, query_name: &str, kind: ErrorKind) {
        let mut inner = self.inner.lock().await;
        inner
            .results
            .insert(query_name.to_owned(), CannedResult::Failure(kind));
    }

    /// Names of the queries executed so far, in order.
    pub async fn executed_queries(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.executed.clone()
    }
}

impl Source for MemorySource {
    async fn query(&self, query: &SourceQuery) -> EtlResult<RowSet> {
        let mut inner = self.inner.lock().await;
        inner.executed.push(query.name.to_owned());

        match inner.results.get(query.name) {
            Some(CannedResult::Rows(rows)) => {
                info!(query = query.name, rows = rows.len(), "served canned rows");
                Ok(rows.clone())
            }
            Some(CannedResult::Failure(kind)) => Err(etl_error!(
                *kind,
                "Canned query failure",
                format!("query `{}` configured to fail", query.name)
            )),
            None => Err(etl_error!(
                ErrorKind::SourceSchemaError,
                "No canned result for query",
                format!("query `{}` is unknown to the memory source", query.name)
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, TableRow};

    const QUERY: SourceQuery = SourceQuery {
        name: "categories",
        sql: "select 1",
    };

    #[tokio::test]
    async fn serves_rows_and_records_queries() {
        let source = MemorySource::new();
        let rows = RowSet::with_rows(["CategoryID"], vec![TableRow::new(vec![Cell::I32(1)])])
            .unwrap();
        source.set_rows("categories", rows.clone()).await;

        assert_eq!(source.query(&QUERY).await.unwrap(), rows);
        assert_eq!(source.executed_queries().await, ["categories"]);
    }

    #[tokio::test]
    async fn failures_are_errors_not_empty_results() {
        let source = MemorySource::new();
        source
            .fail_query("categories", ErrorKind::SourceConnectionFailed)
            .await;

        let err = source.query(&QUERY).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceConnectionFailed);
    }
}
