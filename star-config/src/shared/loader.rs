use serde::Deserialize;

use crate::shared::{LoadConfig, PgConnectionConfig, ValidationError};

/// Complete configuration of a loader run.
///
/// The transactional store is only ever read, the reporting store is read for key maps and
/// written by loads. This intentionally does not implement `Serialize` to avoid leaking
/// secrets.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// Connection to the transactional (normalized) store.
    pub source: PgConnectionConfig,
    /// Connection to the reporting (star schema) store.
    pub reporting: PgConnectionConfig,
    /// Load settings.
    #[serde(default)]
    pub load: LoadConfig,
}

impl LoaderConfig {
    /// Validates the complete loader configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.reporting.validate()?;
        self.load.validate()?;

        if self.source.same_database_as(&self.reporting) {
            return Err(ValidationError::SameDatabase {
                host: self.source.host.clone(),
                port: self.source.port,
                database: self.source.name.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_config(source_db: &str, reporting_db: &str) -> LoaderConfig {
        serde_json::from_value(serde_json::json!({
            "source": {
                "host": "localhost",
                "port": 5432,
                "name": source_db,
                "username": "postgres",
                "tls": { "enabled": false }
            },
            "reporting": {
                "host": "localhost",
                "port": 5432,
                "name": reporting_db,
                "username": "postgres",
                "password": "hunter2",
                "tls": { "enabled": false }
            }
        }))
        .unwrap()
    }

    #[test]
    fn distinct_databases_validate() {
        let config = loader_config("northwind", "northwind_reporting");

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.load, LoadConfig::default());
    }

    #[test]
    fn writing_into_the_source_database_is_rejected() {
        let config = loader_config("northwind", "northwind");

        assert!(matches!(
            config.validate(),
            Err(ValidationError::SameDatabase { .. })
        ));
    }
}
