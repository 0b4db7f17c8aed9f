use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// What a fact build does when the dimension key map it depends on is empty.
///
/// An empty map usually means the dimension build never ran, in which case every fact row
/// would be loaded with a null surrogate key.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyDimensionPolicy {
    /// Fail the fact build before anything is loaded.
    #[default]
    Abort,
    /// Load the fact rows with null surrogate keys.
    Allow,
}

/// Settings shared by every build of a run.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct LoadConfig {
    /// Maximum number of rows sent in a single insert statement.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Behavior of fact builds when a dimension key map is empty.
    #[serde(default)]
    pub empty_dimension_policy: EmptyDimensionPolicy,
}

impl LoadConfig {
    /// Default number of rows per insert statement.
    pub const DEFAULT_BATCH_SIZE: usize = 1000;

    /// Validates the load settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::BatchSizeZero);
        }

        Ok(())
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            empty_dimension_policy: EmptyDimensionPolicy::default(),
        }
    }
}

fn default_batch_size() -> usize {
    LoadConfig::DEFAULT_BATCH_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: LoadConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config, LoadConfig::default());
        assert_eq!(config.empty_dimension_policy, EmptyDimensionPolicy::Abort);
    }

    #[test]
    fn policy_is_snake_case() {
        let config: LoadConfig =
            serde_json::from_str(r#"{"batch_size": 50, "empty_dimension_policy": "allow"}"#)
                .unwrap();

        assert_eq!(config.batch_size, 50);
        assert_eq!(config.empty_dimension_policy, EmptyDimensionPolicy::Allow);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = LoadConfig {
            batch_size: 0,
            ..LoadConfig::default()
        };

        assert_eq!(config.validate(), Err(ValidationError::BatchSizeZero));
    }
}
