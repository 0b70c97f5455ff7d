use coalesce_abi::EncodingError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Invalid pubkey length: expected 96 hex chars, got {len} ({pubkey})")]
    InvalidPubkeyLength { pubkey: String, len: usize },

    #[error("Invalid pubkey {0}: not hex")]
    InvalidPubkeyHex(String),

    #[error("Batch size must be positive")]
    InvalidBatchSize,

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
