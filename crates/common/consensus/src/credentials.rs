//! Helpers for the pod address embedded in execution withdrawal credentials.
//!
//! A full credential is `0x` + 1 prefix byte + 11 zero bytes + 20 address bytes
//! (66 characters); registries sometimes store only the bare address (42 characters).

use alloy_primitives::{Address, hex};

use crate::{
    constants::{ADDRESS_HEX_LENGTH, COMPOUNDING_WITHDRAWAL_PREFIX, WITHDRAWAL_CREDENTIALS_HEX_LENGTH},
    errors::CredentialError,
};

/// Parses the pod address out of a credential string.
pub fn parse_pod_address(withdrawal_credentials: &str) -> Result<Address, CredentialError> {
    let normalized = withdrawal_credentials.trim().to_ascii_lowercase();
    let invalid = || CredentialError::InvalidCredentialFormat(withdrawal_credentials.to_string());

    let body = normalized.strip_prefix("0x").ok_or_else(invalid)?;
    if !body.chars().all(|character| character.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let address_hex = match normalized.len() {
        WITHDRAWAL_CREDENTIALS_HEX_LENGTH | ADDRESS_HEX_LENGTH => &body[body.len() - 40..],
        _ => return Err(invalid()),
    };

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(address_hex, &mut bytes).map_err(|_| invalid())?;
    Ok(Address::from(bytes))
}

/// Lenient form of [`parse_pod_address`]: any unparseable credential is simply ungroupable.
pub fn extract_pod_address(withdrawal_credentials: &str) -> Option<Address> {
    parse_pod_address(withdrawal_credentials).ok()
}

/// Lowercase hex form of a pod address without the `0x` prefix, used as the grouping key.
pub fn pod_key(pod: &Address) -> String {
    hex::encode(pod)
}

/// Leading type byte of a full 32-byte credential. Bare addresses carry no prefix.
pub fn credential_prefix(withdrawal_credentials: &str) -> Option<u8> {
    let normalized = withdrawal_credentials.trim().to_ascii_lowercase();
    if normalized.len() != WITHDRAWAL_CREDENTIALS_HEX_LENGTH {
        return None;
    }
    let prefix = normalized.strip_prefix("0x")?.get(..2)?;
    u8::from_str_radix(prefix, 16).ok()
}

pub fn is_consolidated_prefix(withdrawal_credentials: &str) -> bool {
    credential_prefix(withdrawal_credentials) == Some(COMPOUNDING_WITHDRAWAL_PREFIX)
}

/// Inverse of [`parse_pod_address`]: rebuilds the zero-padded 32-byte credential.
pub fn format_full_credentials(pod: &Address, prefix: u8) -> String {
    format!("0x{prefix:02x}{}{}", "00".repeat(11), pod_key(pod))
}
