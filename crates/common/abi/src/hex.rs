use alloy_primitives::hex;

use crate::errors::EncodingError;

/// Decodes a hex string with or without its `0x` prefix.
pub fn decode_hex(value: &str) -> Result<Vec<u8>, EncodingError> {
    let trimmed = value.trim();
    let bare = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(bare).map_err(|_| EncodingError::InvalidHex(value.to_string()))
}

pub fn to_prefixed_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode_prefixed(data)
}
