// ABOUTME: Registry configuration - cascade behavior and batch limits.
// ABOUTME: Built in code, from environment variables, or from a JSON file.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable toggling delegatee removal cascade.
pub const ENV_CASCADE_DELEGATEE_REMOVAL: &str = "TOOLGATE_CASCADE_DELEGATEE_REMOVAL";

/// Environment variable capping batch sizes.
pub const ENV_MAX_BATCH_SIZE: &str = "TOOLGATE_MAX_BATCH_SIZE";

/// Tunable registry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Remove a delegatee's custom policies when the delegatee is removed.
    pub cascade_delegatee_removal: bool,

    /// Upper bound on elements per batch. `None` means unbounded.
    pub max_batch_size: Option<usize>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cascade_delegatee_removal: true,
            max_batch_size: None,
        }
    }
}

impl RegistryConfig {
    /// Create a new config builder.
    pub fn builder() -> RegistryConfigBuilder {
        RegistryConfigBuilder::new()
    }

    /// Read overrides from `TOOLGATE_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(ENV_CASCADE_DELEGATEE_REMOVAL) {
            config.cascade_delegatee_removal = parse_bool(ENV_CASCADE_DELEGATEE_REMOVAL, &value)?;
        }

        if let Ok(value) = std::env::var(ENV_MAX_BATCH_SIZE) {
            let limit = value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_MAX_BATCH_SIZE.to_string(),
                    value: value.clone(),
                })?;
            config.max_batch_size = Some(limit);
        }

        Ok(config)
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Builder for constructing registry configs.
#[derive(Debug, Default)]
pub struct RegistryConfigBuilder {
    config: RegistryConfig,
}

impl RegistryConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether removing a delegatee also removes its custom policies.
    pub fn cascade_delegatee_removal(mut self, cascade: bool) -> Self {
        self.config.cascade_delegatee_removal = cascade;
        self
    }

    /// Reject batches with more than `limit` elements.
    pub fn max_batch_size(mut self, limit: usize) -> Self {
        self.config.max_batch_size = Some(limit);
        self
    }

    pub fn build(self) -> RegistryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert!(config.cascade_delegatee_removal);
        assert_eq!(config.max_batch_size, None);
    }

    #[test]
    fn test_builder() {
        let config = RegistryConfig::builder()
            .cascade_delegatee_removal(false)
            .max_batch_size(8)
            .build();
        assert!(!config.cascade_delegatee_removal);
        assert_eq!(config.max_batch_size, Some(8));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"max_batch_size": 3}}"#).unwrap();

        let config = RegistryConfig::from_file(file.path()).unwrap();
        assert!(config.cascade_delegatee_removal);
        assert_eq!(config.max_batch_size, Some(3));
    }

    #[test]
    fn test_from_file_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();

        let err = RegistryConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = RegistryConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("k", "YES").unwrap());
        assert!(!parse_bool("k", "0").unwrap());
        assert!(matches!(
            parse_bool("k", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
