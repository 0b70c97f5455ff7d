use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Value of {len} bytes does not fit in a {width}-byte slot")]
    ValueTooWide { len: usize, width: usize },

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Read of {needed} bytes at offset {offset} exceeds calldata length {available}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Word at offset {0} does not fit in a machine-sized integer")]
    Overflow(usize),

    #[error("Selector mismatch: expected {expected}, found {found}")]
    SelectorMismatch { expected: String, found: String },
}
