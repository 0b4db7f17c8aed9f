use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, PgConnection, Postgres, Row, TypeInfo};
use star_config::shared::PgConnectionConfig;
use star_postgres::sqlx::connect_to_database;
use tracing::{error, info, warn};

use crate::contract::{ClearStrategy, TableContract};
use crate::error::{ErrorKind, EtlResult};
use crate::store::{ReplaceStats, ReportingStore};
use crate::types::{Cell, ColumnType, PgNumeric, RowSet, TableRow};
use crate::{bail, etl_error};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Counts foreign keys from other tables that point at the given table.
const REFERENCING_CONSTRAINTS_QUERY: &str = r#"
    select count(*)
    from pg_catalog.pg_constraint
    where contype = 'f'
    and confrelid = $1::regclass
    and conrelid <> confrelid
"#;

/// Reporting store backed by Postgres through sqlx.
///
/// Each operation opens a single connection and closes it before returning. Table replacement
/// runs inside one transaction that is committed only when the clear and every insert
/// succeeded.
#[derive(Debug, Clone)]
pub struct PostgresReportingStore {
    config: PgConnectionConfig,
    batch_size: usize,
}

impl PostgresReportingStore {
    pub fn new(config: PgConnectionConfig, batch_size: usize) -> Self {
        Self { config, batch_size }
    }

    async fn connect(&self) -> EtlResult<PgConnection> {
        connect_to_database(&self.config).await.map_err(|err| {
            error!(
                host = %self.config.host,
                port = self.config.port,
                database = %self.config.name,
                error = %err,
                "could not connect to the reporting store, check the credentials, host and port, tls settings and firewall rules"
            );

            let kind = match &err {
                sqlx::Error::Database(db_error)
                    if db_error.code().is_some_and(|code| code.starts_with("28")) =>
                {
                    ErrorKind::AuthenticationError
                }
                _ => ErrorKind::DestinationConnectionFailed,
            };
            let detail = err.to_string();

            etl_error!(
                kind,
                "Could not connect to the reporting store",
                detail = detail,
                source: err
            )
        })
    }
}

impl ReportingStore for PostgresReportingStore {
    async fn fetch_key_pairs(&self, contract: &'static TableContract) -> EtlResult<RowSet> {
        let sql = contract.key_pairs_sql()?;
        let columns = contract
            .keys
            .map(|keys| [keys.surrogate, keys.natural])
            .unwrap_or_default();

        let mut connection = self.connect().await?;
        let rows = sqlx::query(&sql).fetch_all(&mut connection).await;
        close_connection(connection).await;

        let rows = rows?
            .iter()
            .map(|row| {
                Ok(TableRow::new(vec![
                    decode_key_cell(row, 0)?,
                    decode_key_cell(row, 1)?,
                ]))
            })
            .collect::<EtlResult<Vec<_>>>()?;

        info!(
            table = %contract.table_name(),
            rows = rows.len(),
            "fetched dimension key pairs"
        );

        RowSet::with_rows(columns, rows)
    }

    async fn replace_table(
        &self,
        contract: &'static TableContract,
        rows: RowSet,
    ) -> EtlResult<ReplaceStats> {
        let mut connection = self.connect().await?;
        let result =
            replace_in_transaction(&mut connection, contract, &rows, self.batch_size).await;
        close_connection(connection).await;

        result
    }
}

async fn close_connection(connection: PgConnection) {
    if let Err(err) = connection.close().await {
        warn!(error = %err, "failed to close the reporting store connection cleanly");
    }
}

async fn replace_in_transaction(
    connection: &mut PgConnection,
    contract: &'static TableContract,
    rows: &RowSet,
    batch_size: usize,
) -> EtlResult<ReplaceStats> {
    let mut transaction = connection.begin().await?;

    match clear_and_insert(&mut transaction, contract, rows, batch_size).await {
        Ok(stats) => {
            if let Err(err) = transaction.commit().await {
                error!(
                    table = %contract.table_name(),
                    error = %err,
                    "commit failed, the load was rolled back"
                );

                return Err(err.into());
            }
            info!(
                table = %contract.table_name(),
                deleted = stats.deleted,
                inserted = stats.inserted,
                "replaced table contents"
            );

            Ok(stats)
        }
        Err(err) => {
            if let Err(rollback_err) = transaction.rollback().await {
                warn!(error = %rollback_err, "rollback after a failed load did not complete");
            }
            error!(table = %contract.table_name(), error = %err, "load failed, rolled back");

            Err(err)
        }
    }
}

async fn clear_and_insert(
    connection: &mut PgConnection,
    contract: &'static TableContract,
    rows: &RowSet,
    batch_size: usize,
) -> EtlResult<ReplaceStats> {
    let table_name = contract.table_name();

    if contract.clear_strategy == ClearStrategy::Truncate {
        let referencing: i64 = sqlx::query_scalar(REFERENCING_CONSTRAINTS_QUERY)
            .bind(table_name.as_quoted_identifier())
            .fetch_one(&mut *connection)
            .await?;

        if referencing > 0 {
            bail!(
                ErrorKind::ClearStrategyMismatch,
                "Truncate requested for a table referenced by a foreign key",
                format!("{table_name} is referenced by {referencing} foreign key(s), use delete")
            );
        }
    }

    let deleted = match contract.clear_strategy {
        ClearStrategy::Truncate => {
            let count: i64 = sqlx::query_scalar(&contract.count_sql())
                .fetch_one(&mut *connection)
                .await?;
            sqlx::query(&contract.clear_sql())
                .execute(&mut *connection)
                .await?;

            count.max(0) as u64
        }
        ClearStrategy::Delete => sqlx::query(&contract.clear_sql())
            .execute(&mut *connection)
            .await?
            .rows_affected(),
    };

    info!(
        table = %table_name,
        strategy = %contract.clear_strategy,
        rows = deleted,
        "cleared table"
    );

    let mut inserted = 0;
    for chunk in rows.rows().chunks(contract.rows_per_statement(batch_size)) {
        let sql = contract.insert_sql(chunk.len());
        let mut query = sqlx::query(&sql);
        for row in chunk {
            for (cell, column) in row.values().iter().zip(contract.columns) {
                query = bind_cell(query, cell, column.column_type);
            }
        }

        inserted += query.execute(&mut *connection).await?.rows_affected();
    }

    Ok(ReplaceStats { deleted, inserted })
}

fn bind_cell<'q>(query: PgQuery<'q>, cell: &Cell, column_type: ColumnType) -> PgQuery<'q> {
    match cell {
        Cell::Null => bind_null(query, column_type),
        Cell::Bool(v) => query.bind(*v),
        Cell::I16(v) => query.bind(*v),
        Cell::I32(v) => query.bind(*v),
        Cell::I64(v) => query.bind(*v),
        Cell::F32(v) => query.bind(*v),
        Cell::F64(v) => query.bind(*v),
        Cell::Numeric(PgNumeric::Value(v)) => query.bind(v.clone()),
        // Special values travel as text and are cast by the numeric placeholder.
        Cell::Numeric(special) => query.bind(special.to_string()),
        Cell::String(v) => query.bind(v.clone()),
        Cell::Date(v) => query.bind(*v),
        Cell::Timestamp(v) => query.bind(*v),
        Cell::TimestampTz(v) => query.bind(*v),
        Cell::Bytes(v) => query.bind(v.clone()),
    }
}

/// Binds a null typed like its column, so Postgres does not have to infer the parameter type.
fn bind_null(query: PgQuery<'_>, column_type: ColumnType) -> PgQuery<'_> {
    match column_type {
        ColumnType::Bool => query.bind(None::<bool>),
        ColumnType::Int2 => query.bind(None::<i16>),
        ColumnType::Int4 => query.bind(None::<i32>),
        ColumnType::Int8 => query.bind(None::<i64>),
        ColumnType::Float4 => query.bind(None::<f32>),
        ColumnType::Float8 => query.bind(None::<f64>),
        ColumnType::Numeric => query.bind(None::<bigdecimal::BigDecimal>),
        ColumnType::Text => query.bind(None::<String>),
        ColumnType::Date => query.bind(None::<chrono::NaiveDate>),
        ColumnType::Timestamp => query.bind(None::<chrono::NaiveDateTime>),
        ColumnType::TimestampTz => query.bind(None::<chrono::DateTime<chrono::Utc>>),
        ColumnType::Bytea => query.bind(None::<Vec<u8>>),
    }
}

fn decode_key_cell(row: &PgRow, index: usize) -> EtlResult<Cell> {
    let type_name = row.column(index).type_info().name().to_owned();
    let cell = match type_name.as_str() {
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(Cell::I16),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Cell::I32),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Cell::I64),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(index)?.map(Cell::String)
        }
        _ => bail!(
            ErrorKind::InvalidData,
            "Unsupported dimension key type",
            format!("key column {index} has type {type_name}")
        ),
    };

    Ok(cell.unwrap_or(Cell::Null))
}
