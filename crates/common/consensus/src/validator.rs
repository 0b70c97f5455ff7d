use alloy_primitives::{Address, B256, hex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    constants::PUBKEY_LENGTH,
    credentials::{credential_prefix, extract_pod_address, is_consolidated_prefix},
};

/// One beacon chain validator as reported by the operator's registry, optionally enriched
/// with beacon data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Operator-local identifier.
    pub id: u64,

    pub pubkey: String,

    /// Either the full 32-byte credential or the bare 20-byte pod address.
    #[serde(default)]
    pub withdrawal_credentials: String,

    /// Balance from an authoritative beacon source, if one was fetched.
    #[serde(default)]
    pub balance_eth: Option<f64>,

    /// Position in the global validator registry.
    #[serde(default, alias = "index", alias = "validator_index")]
    pub beacon_index: Option<u64>,

    /// Pre-existing 0x02 validator that may only ever receive consolidations.
    #[serde(default)]
    pub is_existing_target: bool,

    /// Node contract owning the validator, used to route post-sweep withdrawals.
    #[serde(default, alias = "etherfi_node", skip_serializing_if = "Option::is_none")]
    pub node_address: Option<Address>,
}

impl ValidatorRecord {
    pub fn new(id: u64, pubkey: impl Into<String>, withdrawal_credentials: impl Into<String>) -> Self {
        Self {
            id,
            pubkey: pubkey.into(),
            withdrawal_credentials: withdrawal_credentials.into(),
            balance_eth: None,
            beacon_index: None,
            is_existing_target: false,
            node_address: None,
        }
    }

    pub fn with_balance_eth(mut self, balance_eth: f64) -> Self {
        self.balance_eth = Some(balance_eth);
        self
    }

    pub fn with_beacon_index(mut self, beacon_index: u64) -> Self {
        self.beacon_index = Some(beacon_index);
        self
    }

    pub fn as_existing_target(mut self) -> Self {
        self.is_existing_target = true;
        self
    }

    /// Pubkey in the canonical form used for identity comparisons: lowercase, `0x` prefixed.
    pub fn normalized_pubkey(&self) -> String {
        normalize_pubkey_key(&self.pubkey)
    }

    pub fn pod_address(&self) -> Option<Address> {
        extract_pod_address(&self.withdrawal_credentials)
    }

    pub fn credential_prefix(&self) -> Option<u8> {
        credential_prefix(&self.withdrawal_credentials)
    }

    /// Check if the record carries a 0x02 prefixed "compounding" withdrawal credential.
    pub fn has_compounding_withdrawal_credential(&self) -> bool {
        is_consolidated_prefix(&self.withdrawal_credentials)
    }

    /// Raw key bytes, if the pubkey is well-formed hex of the BLS key length.
    pub fn pubkey_bytes(&self) -> Option<[u8; PUBKEY_LENGTH]> {
        let mut bytes = [0u8; PUBKEY_LENGTH];
        let pubkey = self.normalized_pubkey();
        hex::decode_to_slice(&pubkey[2..], &mut bytes).ok()?;
        Some(bytes)
    }

    pub fn pubkey_hash(&self) -> Option<B256> {
        self.pubkey_bytes()
            .map(|pubkey| validator_pubkey_hash(&pubkey))
    }

    /// Short form for log lines.
    pub fn short_pubkey(&self) -> String {
        let pubkey = self.normalized_pubkey();
        let chars = pubkey.chars().collect::<Vec<_>>();
        if chars.len() <= 24 {
            return pubkey;
        }
        let head = chars[..14].iter().collect::<String>();
        let tail = chars[chars.len() - 10..].iter().collect::<String>();
        format!("{head}...{tail}")
    }
}

pub fn normalize_pubkey_key(pubkey: &str) -> String {
    let trimmed = pubkey.trim();
    let bare = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", bare.to_ascii_lowercase())
}

/// Hash the node manager indexes validators by: `sha256(pubkey || 16 zero bytes)`, i.e. the
/// SSZ root of the pubkey padded to two chunks.
pub fn validator_pubkey_hash(pubkey: &[u8; PUBKEY_LENGTH]) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(pubkey);
    hasher.update([0u8; 16]);
    B256::from_slice(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use alloy_primitives::b256;

    use super::*;

    #[test]
    fn test_deserialize_with_aliases() {
        let record: ValidatorRecord = serde_json::from_str(
            r#"{
                "id": 7,
                "pubkey": "0xAB",
                "withdrawal_credentials": "0x010000000000000000000000b1d6a0a1a2a3a4a5a6a7a8a9aaabacadaeafb0b1",
                "index": 42,
                "etherfi_node": "0x00000000000000000000000000000000000000aa"
            }"#,
        )
        .expect("record should deserialize");

        assert_eq!(record.id, 7);
        assert_eq!(record.beacon_index, Some(42));
        assert_eq!(record.balance_eth, None);
        assert!(!record.is_existing_target);
        assert!(record.node_address.is_some());
        assert_eq!(record.normalized_pubkey(), "0xab");
        assert_eq!(record.credential_prefix(), Some(1));
    }

    #[test]
    fn test_normalize_pubkey_key() {
        assert_eq!(normalize_pubkey_key("ABcd"), "0xabcd");
        assert_eq!(normalize_pubkey_key(" 0XABcd "), "0xabcd");
        assert_eq!(normalize_pubkey_key("0xabcd"), "0xabcd");
    }

    #[test]
    fn test_short_pubkey() {
        let record = ValidatorRecord::new(1, format!("0x{}", "ab".repeat(48)), "");
        assert_eq!(record.short_pubkey(), "0xabababababab...ababababab");
        assert_eq!(ValidatorRecord::new(2, "0xABCD", "").short_pubkey(), "0xabcd");

        let mangled = ValidatorRecord::new(3, format!("0xa{}", "é".repeat(40)), "");
        assert_eq!(
            mangled.short_pubkey(),
            format!("0xa{}...{}", "é".repeat(11), "é".repeat(10))
        );
    }

    #[test]
    fn test_validator_pubkey_hash() {
        assert_eq!(
            validator_pubkey_hash(&[0u8; PUBKEY_LENGTH]),
            b256!("0xf5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b")
        );

        let record = ValidatorRecord::new(1, format!("0x{}", "AB".repeat(48)), "");
        assert_eq!(
            record.pubkey_hash(),
            Some(b256!(
                "0x019e78df2650f10195f5bc196de2781592fa0d386437761910991d6aaa036db2"
            ))
        );
        assert_eq!(ValidatorRecord::new(2, "0xabcd", "").pubkey_hash(), None);
    }
}
