use sqlx::{Connection, PgConnection};
use star_config::shared::{IntoConnectOptions, PgConnectionConfig};
use tracing::debug;

#[cfg(feature = "test-utils")]
pub mod test_utils;

/// Opens a single, unpooled connection to the configured database.
///
/// Every load stage owns exactly one connection for its duration, so no pool is involved.
pub async fn connect_to_database(config: &PgConnectionConfig) -> Result<PgConnection, sqlx::Error> {
    let connection = PgConnection::connect_with(&config.with_db()).await?;
    debug!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        "connected to postgres"
    );

    Ok(connection)
}
