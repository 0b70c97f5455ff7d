use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error(
        "Invalid withdrawal credential format, expected 42 or 66 hex characters with 0x prefix: {0:?}"
    )]
    InvalidCredentialFormat(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("Invalid sweep state: sweep index {sweep_index} with {total_validators} validators")]
    InvalidSweepState {
        sweep_index: u64,
        total_validators: u64,
    },

    #[error("Beacon index {beacon_index} is outside the validator set of size {total_validators}")]
    IndexOutOfRange {
        beacon_index: u64,
        total_validators: u64,
    },

    #[error("Bucket interval must be a positive number of hours")]
    InvalidInterval,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("Missing beacon balance for existing 0x02 target {pubkey}")]
    MissingBalance { pubkey: String },
}
