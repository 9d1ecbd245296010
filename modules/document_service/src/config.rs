//! Configuration for document service module

use anyhow::{ensure, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::allocation::CounterDefaults;
use crate::domain::validation::PADDING_RANGE;

/// Environment variable prefix for overrides, e.g. `DOCUMENT_SERVICE_SYSTEM_USER`
pub const ENV_PREFIX: &str = "DOCUMENT_SERVICE_";

/// Document service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Padding length of counters created on first use
    #[serde(default = "default_padding_length")]
    pub default_padding_length: u8,

    /// Year-rollover flag of counters created on first use
    #[serde(default = "default_true")]
    pub default_reset_on_year_change: bool,

    /// Actor recorded when the caller supplies no user
    #[serde(default = "default_system_user")]
    pub system_user: String,

    /// Attempts per allocation when a concurrent first use wins the insert
    #[serde(default = "default_allocation_retry_attempts")]
    pub allocation_retry_attempts: u32,

    /// Connection string used by `DocumentServiceModule::connect`
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_padding_length: default_padding_length(),
            default_reset_on_year_change: true,
            system_user: default_system_user(),
            allocation_retry_attempts: default_allocation_retry_attempts(),
            database_url: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file overlaid with `DOCUMENT_SERVICE_*`
    /// environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        ensure!(
            PADDING_RANGE.contains(&self.default_padding_length),
            "default_padding_length must be between {} and {}",
            PADDING_RANGE.start(),
            PADDING_RANGE.end()
        );
        ensure!(
            self.allocation_retry_attempts >= 1,
            "allocation_retry_attempts must be at least 1"
        );
        ensure!(
            !self.system_user.trim().is_empty(),
            "system_user must not be empty"
        );
        Ok(())
    }

    /// Settings applied to counters created on first use
    pub fn counter_defaults(&self) -> CounterDefaults {
        CounterDefaults {
            padding_length: self.default_padding_length,
            reset_on_year_change: self.default_reset_on_year_change,
        }
    }
}

fn default_padding_length() -> u8 {
    5
}

fn default_true() -> bool {
    true
}

fn default_system_user() -> String {
    "System".to_string()
}

fn default_allocation_retry_attempts() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_padding_length, 5);
        assert!(config.default_reset_on_year_change);
        assert_eq!(config.system_user, "System");
        assert_eq!(config.allocation_retry_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_padding_length: 7").unwrap();
        writeln!(file, "system_user: scheduler").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.default_padding_length, 7);
        assert_eq!(config.system_user, "scheduler");
        assert_eq!(config.allocation_retry_attempts, 3);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "padding: 7").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_out_of_range_padding_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_padding_length: 12").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
