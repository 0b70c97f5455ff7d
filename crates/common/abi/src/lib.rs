#![warn(clippy::unwrap_used)]

pub mod decode;
pub mod encode;
pub mod errors;
pub mod hex;
pub mod selector;

pub use decode::AbiDecoder;
pub use encode::{AbiValue, WORD_SIZE, Word};
pub use errors::EncodingError;
pub use hex::{decode_hex, to_prefixed_hex};
