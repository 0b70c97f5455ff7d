use std::path::PathBuf;

use coalesce_consensus::errors::{BalanceError, SweepError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Bucket interval must be a positive number of hours")]
    InvalidBucketHours,

    #[error("Max target balance must be between {min} and {max} ETH, got {value}")]
    InvalidMaxTargetBalance { value: f64, min: f64, max: f64 },

    #[error("Batch size must be at least 2 (target plus one source), got {0}")]
    InvalidBatchSize(usize),

    #[error("Withdrawal amount must be at least {min} ETH, got {value}")]
    InvalidWithdrawalAmount { value: f64, min: f64 },
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Sweep(#[from] SweepError),
}
