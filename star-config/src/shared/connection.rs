use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions as SqlxConnectOptions, PgSslMode as SqlxSslMode};
use tokio_postgres::{Config as TokioPgConnectOptions, config::SslMode as TokioPgSslMode};

use crate::shared::ValidationError;

/// Name reported to Postgres in `application_name` for every loader connection.
const APPLICATION_NAME: &str = "star_loader";

/// Static Postgres connection options that ensure sane defaults.
///
/// These options are applied to all connections so that dates and numerics are rendered
/// identically regardless of the server configuration.
pub struct DefaultPgConnectionOptions;

impl DefaultPgConnectionOptions {
    /// Returns the options as a string suitable for the tokio-postgres options parameter.
    pub fn to_options_string() -> String {
        "-c datestyle=ISO -c intervalstyle=postgres -c extra_float_digits=3 -c client_encoding=UTF8 -c timezone=UTC"
            .to_string()
    }

    /// Returns the options as key-value pairs suitable for sqlx.
    pub fn to_key_value_pairs() -> Vec<(String, String)> {
        vec![
            ("datestyle".to_string(), "ISO".to_string()),
            ("intervalstyle".to_string(), "postgres".to_string()),
            ("extra_float_digits".to_string(), "3".to_string()),
            ("client_encoding".to_string(), "UTF8".to_string()),
            ("timezone".to_string(), "UTC".to_string()),
        ]
    }
}

/// Configuration for connecting to a Postgres database.
///
/// Used for both the transactional (source) store and the reporting store. This intentionally
/// does not implement [`Serialize`] to avoid leaking the password.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PgConnectionConfig {
    /// Hostname or IP address of the Postgres server.
    pub host: String,
    /// Port number on which the Postgres server is listening.
    pub port: u16,
    /// Name of the database to connect to.
    pub name: String,
    /// Username for authenticating with the Postgres server.
    pub username: String,
    /// Password for the specified user, redacted in debug output.
    pub password: Option<SecretString>,
    /// TLS configuration for secure connections.
    pub tls: TlsConfig,
}

impl PgConnectionConfig {
    /// Validates the connection descriptor.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.tls.validate()
    }

    /// Returns `true` when both descriptors address the same database on the same server.
    pub fn same_database_as(&self, other: &PgConnectionConfig) -> bool {
        self.host.eq_ignore_ascii_case(&other.host)
            && self.port == other.port
            && self.name == other.name
    }
}

/// TLS settings for secure Postgres connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TlsConfig {
    /// PEM-encoded trusted root certificates.
    #[serde(default)]
    pub trusted_root_certs: String,
    /// Whether TLS is enabled for the connection.
    pub enabled: bool,
}

impl TlsConfig {
    /// Returns a configuration with TLS turned off.
    pub fn disabled() -> Self {
        Self {
            trusted_root_certs: String::new(),
            enabled: false,
        }
    }

    /// Validates the [`TlsConfig`].
    ///
    /// Returns [`ValidationError::MissingTrustedRootCerts`] if TLS is enabled but no certificates
    /// are provided.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.enabled && self.trusted_root_certs.is_empty() {
            return Err(ValidationError::MissingTrustedRootCerts);
        }

        Ok(())
    }
}

/// Converts a [`PgConnectionConfig`] into driver specific connect options.
///
/// The reporting store talks to Postgres through sqlx while the source reader uses
/// tokio-postgres, so the connection settings are kept in one place and converted twice.
pub trait IntoConnectOptions<Output> {
    /// Creates connection options without selecting a database.
    ///
    /// Useful for administrative operations such as creating a database.
    fn without_db(&self) -> Output;

    /// Creates connection options for the configured database.
    fn with_db(&self) -> Output;
}

impl IntoConnectOptions<SqlxConnectOptions> for PgConnectionConfig {
    fn without_db(&self) -> SqlxConnectOptions {
        let ssl_mode = if self.tls.enabled {
            SqlxSslMode::VerifyFull
        } else {
            SqlxSslMode::Prefer
        };
        let mut options = SqlxConnectOptions::new_without_pgpass()
            .host(&self.host)
            .username(&self.username)
            .port(self.port)
            .ssl_mode(ssl_mode)
            .application_name(APPLICATION_NAME)
            .options(DefaultPgConnectionOptions::to_key_value_pairs());

        if self.tls.enabled {
            options =
                options.ssl_root_cert_from_pem(self.tls.trusted_root_certs.clone().into_bytes());
        }

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }

    fn with_db(&self) -> SqlxConnectOptions {
        let options: SqlxConnectOptions = self.without_db();
        options.database(&self.name)
    }
}

impl IntoConnectOptions<TokioPgConnectOptions> for PgConnectionConfig {
    fn without_db(&self) -> TokioPgConnectOptions {
        let ssl_mode = if self.tls.enabled {
            TokioPgSslMode::Require
        } else {
            TokioPgSslMode::Prefer
        };
        let mut config = TokioPgConnectOptions::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.username)
            .application_name(APPLICATION_NAME)
            .options(&DefaultPgConnectionOptions::to_options_string())
            // Certificates are verified by the rustls connector, tokio-postgres only needs to
            // know whether to negotiate TLS.
            .ssl_mode(ssl_mode);

        if let Some(password) = &self.password {
            config.password(password.expose_secret());
        }

        config
    }

    fn with_db(&self) -> TokioPgConnectOptions {
        let mut options: TokioPgConnectOptions = self.without_db();
        options.dbname(&self.name);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(host: &str, name: &str) -> PgConnectionConfig {
        PgConnectionConfig {
            host: host.to_string(),
            port: 5432,
            name: name.to_string(),
            username: "postgres".to_string(),
            password: Some(SecretString::new("secret".to_string())),
            tls: TlsConfig::disabled(),
        }
    }

    #[test]
    fn test_options_string_format() {
        assert_eq!(
            DefaultPgConnectionOptions::to_options_string(),
            "-c datestyle=ISO -c intervalstyle=postgres -c extra_float_digits=3 -c client_encoding=UTF8 -c timezone=UTC"
        );
    }

    #[test]
    fn test_key_value_pairs() {
        let pairs = DefaultPgConnectionOptions::to_key_value_pairs();

        assert_eq!(pairs.len(), 5);
        assert!(pairs.contains(&("datestyle".to_string(), "ISO".to_string())));
        assert!(pairs.contains(&("timezone".to_string(), "UTC".to_string())));
    }

    #[test]
    fn tls_without_certificates_is_rejected() {
        let tls = TlsConfig {
            trusted_root_certs: String::new(),
            enabled: true,
        };

        assert_eq!(tls.validate(), Err(ValidationError::MissingTrustedRootCerts));
        assert_eq!(TlsConfig::disabled().validate(), Ok(()));
    }

    #[test]
    fn same_database_ignores_host_case() {
        let source = connection("LOCALHOST", "northwind");

        assert!(source.same_database_as(&connection("localhost", "northwind")));
        assert!(!source.same_database_as(&connection("localhost", "northwind_reporting")));
    }

    #[test]
    fn tokio_postgres_options_select_the_database() {
        let config: TokioPgConnectOptions = connection("localhost", "northwind").with_db();

        assert_eq!(config.get_dbname(), Some("northwind"));
        assert_eq!(config.get_user(), Some("postgres"));
        assert_eq!(config.get_application_name(), Some(APPLICATION_NAME));
    }
}
