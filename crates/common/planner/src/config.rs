use std::{fs, path::Path};

use coalesce_consensus::{
    balance::{Gwei, eth_to_gwei, gwei_to_eth},
    constants::{
        DEFAULT_BUCKET_HOURS, DEFAULT_MAX_TARGET_BALANCE, MAX_EFFECTIVE_BALANCE_ELECTRA,
        MIN_MAX_TARGET_BALANCE,
    },
};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Validators per consolidation transaction, target included.
pub const DEFAULT_BATCH_SIZE: usize = 58;
pub const DEFAULT_FEE_PER_REQUEST_WEI: u64 = 1;

/// Tunables for one planning run. Every field has a default so a YAML file only needs the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Width of a sweep bucket.
    pub bucket_hours: u64,

    /// Ceiling for a target's balance after all of its sources land.
    pub max_target_balance_eth: f64,

    pub batch_size: usize,

    pub fee_per_request_wei: u64,

    /// Number of sources to consolidate across the whole plan. `None` means every
    /// available source.
    pub source_count: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            bucket_hours: DEFAULT_BUCKET_HOURS,
            max_target_balance_eth: gwei_to_eth(DEFAULT_MAX_TARGET_BALANCE),
            batch_size: DEFAULT_BATCH_SIZE,
            fee_per_request_wei: DEFAULT_FEE_PER_REQUEST_WEI,
            source_count: None,
        }
    }
}

impl PlannerConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_hours == 0 {
            return Err(ConfigError::InvalidBucketHours);
        }

        let in_range = eth_to_gwei(self.max_target_balance_eth).is_some_and(|balance| {
            (MIN_MAX_TARGET_BALANCE..=MAX_EFFECTIVE_BALANCE_ELECTRA).contains(&balance)
        });
        if !in_range {
            return Err(ConfigError::InvalidMaxTargetBalance {
                value: self.max_target_balance_eth,
                min: gwei_to_eth(MIN_MAX_TARGET_BALANCE),
                max: gwei_to_eth(MAX_EFFECTIVE_BALANCE_ELECTRA),
            });
        }

        if self.batch_size < 2 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }

    pub fn max_target_balance(&self) -> Gwei {
        eth_to_gwei(self.max_target_balance_eth).unwrap_or(DEFAULT_MAX_TARGET_BALANCE)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_target_balance(), DEFAULT_MAX_TARGET_BALANCE);
        assert_eq!(config.batch_size, 58);
        assert_eq!(config.bucket_hours, 6);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "max_target_balance_eth: 1984\nbucket_hours: 12")?;

        let config = PlannerConfig::from_yaml_file(file.path())?;
        assert_eq!(config.max_target_balance_eth, 1984.0);
        assert_eq!(config.bucket_hours, 12);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.source_count, None);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let err = PlannerConfig::from_yaml_file("/nonexistent/planner.yaml")
            .expect_err("file does not exist");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[rstest]
    #[case("bucket_hours: 0")]
    #[case("max_target_balance_eth: 2049")]
    #[case("max_target_balance_eth: 63.9")]
    #[case("max_target_balance_eth: -5")]
    #[case("batch_size: 1")]
    #[case("bucket_hours: [1]")]
    fn test_invalid_yaml(#[case] contents: &str) {
        assert!(PlannerConfig::from_yaml_str(contents).is_err());
    }

    #[rstest]
    #[case(64.0)]
    #[case(2048.0)]
    fn test_max_target_balance_bounds_are_inclusive(#[case] max_target_balance_eth: f64) {
        let config = PlannerConfig {
            max_target_balance_eth,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
