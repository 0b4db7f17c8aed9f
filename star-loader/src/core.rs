use star_config::shared::{LoaderConfig, PgConnectionConfig};
use star_etl::pipeline::{BuildReport, Pipeline};
use star_etl::source::postgres::PostgresSource;
use star_etl::store::postgres::PostgresReportingStore;
use star_postgres::types::TableName;
use tracing::{debug, info};

use crate::cli::{BuildTarget, Command};
use crate::error::LoaderResult;

/// Runs a parsed command against the configured stores.
pub async fn run_command(command: Command, config: LoaderConfig) -> LoaderResult<()> {
    log_config(&config);

    match command {
        Command::Run { target } => run_builds(target, config).await,
        Command::Probe { schema, table } => {
            probe(&config.source, TableName::new(schema, table)).await
        }
    }
}

async fn run_builds(target: BuildTarget, config: LoaderConfig) -> LoaderResult<()> {
    let source = PostgresSource::new(config.source);
    let store = PostgresReportingStore::new(config.reporting, config.load.batch_size);
    let pipeline = Pipeline::new(config.load, source, store);

    let reports = match target.build() {
        Some(build) => vec![pipeline.run(build).await?],
        None => pipeline.run_all().await?,
    };

    for report in &reports {
        log_report(report);
    }

    Ok(())
}

async fn probe(config: &PgConnectionConfig, table: TableName) -> LoaderResult<()> {
    let source = PostgresSource::new(config.clone());
    let count = source.probe(&table).await?;

    info!(
        host = %config.host,
        database = %config.name,
        table = %table,
        rows = count,
        "transactional store is reachable"
    );

    Ok(())
}

fn log_report(report: &BuildReport) {
    info!(
        build = %report.build,
        extracted = report.extracted,
        outcome = ?report.outcome,
        "build finished"
    );
}

fn log_config(config: &LoaderConfig) {
    log_connection_config("source", &config.source);
    log_connection_config("reporting", &config.reporting);
    debug!(
        batch_size = config.load.batch_size,
        empty_dimension_policy = ?config.load.empty_dimension_policy,
        "using load config"
    );
}

fn log_connection_config(role: &str, config: &PgConnectionConfig) {
    debug!(
        role,
        host = %config.host,
        port = config.port,
        dbname = %config.name,
        username = %config.username,
        tls_enabled = config.tls.enabled,
        "using postgres connection config"
    );
}
