use secrecy::SecretString;
use star_config::shared::{PgConnectionConfig, TlsConfig};
use star_postgres::sqlx::test_utils::PgDatabase;
use uuid::Uuid;

use crate::test_utils::schema::{NORTHWIND_FIXTURES, NORTHWIND_SCHEMA, REPORTING_SCHEMA};

/// Connection settings for a uniquely named database on the test server.
///
/// Configuration is read from environment variables:
/// - `TESTS_DATABASE_HOST`: Postgres server hostname (required)
/// - `TESTS_DATABASE_PORT`: Postgres server port (required)
/// - `TESTS_DATABASE_USERNAME`: Database user (required)
/// - `TESTS_DATABASE_PASSWORD`: Database password (optional)
pub fn local_pg_connection_config() -> PgConnectionConfig {
    PgConnectionConfig {
        host: std::env::var("TESTS_DATABASE_HOST").expect("TESTS_DATABASE_HOST must be set"),
        port: std::env::var("TESTS_DATABASE_PORT")
            .expect("TESTS_DATABASE_PORT must be set")
            .parse()
            .expect("TESTS_DATABASE_PORT must be a valid port number"),
        name: Uuid::new_v4().to_string(),
        username: std::env::var("TESTS_DATABASE_USERNAME")
            .expect("TESTS_DATABASE_USERNAME must be set"),
        password: std::env::var("TESTS_DATABASE_PASSWORD")
            .ok()
            .map(SecretString::new),
        tls: TlsConfig::disabled(),
    }
}

/// Creates a transactional database holding the Northwind tables and fixtures.
pub async fn spawn_source_database() -> PgDatabase {
    let database = PgDatabase::new(local_pg_connection_config()).await;
    database.run_sql(NORTHWIND_SCHEMA).await;
    database.run_sql(NORTHWIND_FIXTURES).await;

    database
}

/// Creates an empty reporting database with the star schema tables.
pub async fn spawn_reporting_database() -> PgDatabase {
    let database = PgDatabase::new(local_pg_connection_config()).await;
    database.run_sql(REPORTING_SCHEMA).await;

    database
}
