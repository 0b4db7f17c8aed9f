use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rustls::ClientConfig;
use star_config::shared::{IntoConnectOptions, PgConnectionConfig};
use star_postgres::types::TableName;
use std::io::BufReader;
use std::sync::Arc;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Client, Config, Connection, NoTls, Row, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{Instrument, debug, error, info};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::source::{Source, SourceQuery};
use crate::types::{Cell, PgNumeric, RowSet, TableRow};

/// Spawns a background task driving a Postgres connection until it terminates.
///
/// The task ends on its own once the [`Client`] that owns the connection is dropped.
fn spawn_postgres_connection<T>(connection: Connection<Socket, T::Stream>)
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let span = tracing::Span::current();
    let task = async move {
        match connection.await {
            Err(err) => error!("an error occurred during the postgres connection: {}", err),
            Ok(()) => debug!("postgres connection terminated successfully"),
        }
    }
    .instrument(span);

    tokio::spawn(task);
}

/// Reads the transactional store through tokio-postgres.
///
/// Every call opens its own connection, runs inside a read-only transaction and drops the
/// connection before returning, on success and on failure alike.
#[derive(Debug, Clone)]
pub struct PostgresSource {
    config: PgConnectionConfig,
}

impl PostgresSource {
    pub fn new(config: PgConnectionConfig) -> Self {
        Self { config }
    }

    /// Counts the rows of `table` to check that the store is reachable and readable.
    pub async fn probe(&self, table: &TableName) -> EtlResult<i64> {
        let sql = format!("select count(*) from {}", table.as_quoted_identifier());
        let row_set = self.run("probe", &sql).await?;

        let count = row_set
            .rows()
            .first()
            .and_then(|row| row.values().first())
            .and_then(Cell::to_i64);

        match count {
            Some(count) => {
                info!(table = %table, rows = count, "probe succeeded");
                Ok(count)
            }
            None => bail!(
                ErrorKind::SourceQueryFailed,
                "Probe returned no count",
                table
            ),
        }
    }

    async fn run(&self, name: &str, sql: &str) -> EtlResult<RowSet> {
        let mut client = self.connect().await?;
        let row_set = read_only_query(&mut client, sql).await;

        match &row_set {
            Ok(row_set) => info!(query = name, rows = row_set.len(), "extracted rows"),
            Err(err) => error!(query = name, error = %err, "extraction failed"),
        }

        row_set
    }

    async fn connect(&self) -> EtlResult<Client> {
        let result = match self.config.tls.enabled {
            true => self.connect_tls().await,
            false => self.connect_no_tls().await,
        };

        if let Err(err) = &result {
            error!(
                host = %self.config.host,
                port = self.config.port,
                database = %self.config.name,
                error = %err,
                "could not connect to the transactional store, check the credentials, host and port, tls settings and firewall rules"
            );
        }

        result
    }

    async fn connect_no_tls(&self) -> EtlResult<Client> {
        let config: Config = self.config.with_db();
        let (client, connection) = config.connect(NoTls).await?;

        spawn_postgres_connection::<NoTls>(connection);
        debug!("connected to the transactional store without tls");

        Ok(client)
    }

    async fn connect_tls(&self) -> EtlResult<Client> {
        let config: Config = self.config.with_db();

        let mut root_store = rustls::RootCertStore::empty();
        let mut root_certs_reader = BufReader::new(self.config.tls.trusted_root_certs.as_bytes());
        for cert in rustls_pemfile::certs(&mut root_certs_reader) {
            let cert = cert?;
            root_store.add(cert)?;
        }

        let tls_config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::aws_lc_rs::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        let (client, connection) = config.connect(MakeRustlsConnect::new(tls_config)).await?;

        spawn_postgres_connection::<MakeRustlsConnect>(connection);
        debug!("connected to the transactional store with tls");

        Ok(client)
    }
}

impl Source for PostgresSource {
    async fn query(&self, query: &SourceQuery) -> EtlResult<RowSet> {
        self.run(query.name, query.sql).await
    }
}

async fn read_only_query(client: &mut Client, sql: &str) -> EtlResult<RowSet> {
    let transaction = client.build_transaction().read_only(true).start().await?;

    let statement = transaction.prepare(sql).await?;
    let columns = statement
        .columns()
        .iter()
        .map(|column| column.name().to_owned())
        .collect::<Vec<_>>();
    let column_types = statement
        .columns()
        .iter()
        .map(|column| column.type_().clone())
        .collect::<Vec<_>>();

    let rows = transaction.query(&statement, &[]).await?;
    transaction.commit().await?;

    let rows = rows
        .iter()
        .map(|row| decode_row(row, &columns, &column_types))
        .collect::<EtlResult<Vec<_>>>()?;

    RowSet::with_rows(columns, rows)
}

fn decode_row(row: &Row, columns: &[String], column_types: &[Type]) -> EtlResult<TableRow> {
    let mut values = Vec::with_capacity(column_types.len());
    for (index, column_type) in column_types.iter().enumerate() {
        match decode_cell(row, index, column_type) {
            Ok(Some(cell)) => values.push(cell),
            Ok(None) => bail!(
                ErrorKind::SourceSchemaError,
                "Unsupported source column type",
                format!("column `{}` has type {column_type}", columns[index])
            ),
            Err(err) => bail!(
                ErrorKind::ConversionError,
                "Source value could not be decoded",
                format!("column `{}` of type {column_type}", columns[index]),
                source: err
            ),
        }
    }

    Ok(TableRow::new(values))
}

fn get<'a, T, F>(row: &'a Row, index: usize, wrap: F) -> Result<Option<Cell>, tokio_postgres::Error>
where
    T: FromSql<'a>,
    F: FnOnce(T) -> Cell,
{
    let value = row.try_get::<_, Option<T>>(index)?;

    Ok(Some(value.map(wrap).unwrap_or(Cell::Null)))
}

/// Decodes one value, returning [`None`] for column types without a [`Cell`] counterpart.
fn decode_cell(
    row: &Row,
    index: usize,
    column_type: &Type,
) -> Result<Option<Cell>, tokio_postgres::Error> {
    match *column_type {
        Type::BOOL => get(row, index, Cell::Bool),
        Type::INT2 => get(row, index, Cell::I16),
        Type::INT4 => get(row, index, Cell::I32),
        Type::INT8 => get(row, index, Cell::I64),
        Type::OID => get(row, index, |v: u32| Cell::I64(i64::from(v))),
        Type::FLOAT4 => get(row, index, Cell::F32),
        Type::FLOAT8 => get(row, index, Cell::F64),
        Type::NUMERIC => get(row, index, |v: PgNumeric| Cell::Numeric(v)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => get(row, index, Cell::String),
        Type::DATE => get(row, index, |v: NaiveDate| Cell::Date(v)),
        Type::TIMESTAMP => get(row, index, |v: NaiveDateTime| Cell::Timestamp(v)),
        Type::TIMESTAMPTZ => get(row, index, |v: DateTime<Utc>| Cell::TimestampTz(v)),
        Type::BYTEA => get(row, index, Cell::Bytes),
        _ => Ok(None),
    }
}
