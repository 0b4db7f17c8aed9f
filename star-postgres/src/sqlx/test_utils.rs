use sqlx::{Connection, Executor, PgConnection, PgPool};
use star_config::shared::{IntoConnectOptions, PgConnectionConfig};
use tokio::runtime::Handle;

/// Throwaway Postgres database that is dropped together with this value.
///
/// Dropping runs the cleanup on the current runtime via `block_in_place`, so tests using it must
/// run on the multi-threaded flavor.
pub struct PgDatabase {
    pub config: PgConnectionConfig,
    pub pool: PgPool,
    destroy_on_drop: bool,
}

impl PgDatabase {
    /// Creates the database described by `config` and connects a pool to it.
    pub async fn new(config: PgConnectionConfig) -> Self {
        let pool = create_pg_database(&config).await;

        Self {
            config,
            pool,
            destroy_on_drop: true,
        }
    }

    /// Executes a batch of statements, panicking on failure.
    pub async fn run_sql(&self, sql: &str) {
        self.pool
            .execute(sql)
            .await
            .unwrap_or_else(|err| panic!("Failed to run sql `{sql}`: {err}"));
    }
}

impl Drop for PgDatabase {
    fn drop(&mut self) {
        if self.destroy_on_drop {
            let config = self.config.clone();
            let pool = self.pool.clone();
            tokio::task::block_in_place(move || {
                Handle::current().block_on(async move {
                    pool.close().await;
                    drop_pg_database(&config).await;
                });
            });
        }
    }
}

/// Creates a new Postgres database and returns a connection pool.
///
/// # Panics
/// Panics if connection or database creation fails.
pub async fn create_pg_database(config: &PgConnectionConfig) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"create database "{}";"#, config.name))
        .await
        .expect("Failed to create database");

    PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres")
}

/// Drops a Postgres database and terminates all connections.
///
/// Never panics, so that cleanup does not fail when the database is already gone.
pub async fn drop_pg_database(config: &PgConnectionConfig) {
    let mut connection = match PgConnection::connect_with(&config.without_db()).await {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("warning: failed to connect to Postgres for cleanup: {e}");
            return;
        }
    };

    if let Err(e) = connection
        .execute(&*format!(
            r#"
            select pg_terminate_backend(pg_stat_activity.pid)
            from pg_stat_activity
            where pg_stat_activity.datname = '{}'
            and pid <> pg_backend_pid();"#,
            config.name
        ))
        .await
    {
        eprintln!(
            "warning: failed to terminate connections for database {}: {}",
            config.name, e
        );
    }

    if let Err(e) = connection
        .execute(&*format!(r#"drop database if exists "{}";"#, config.name))
        .await
    {
        eprintln!("warning: failed to drop database {}: {}", config.name, e);
    }
}
