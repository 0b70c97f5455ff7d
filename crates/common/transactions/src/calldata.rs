//! Calldata for the node manager, timelock and pod withdrawal entry points.

use alloy_primitives::{Address, B256, U256, hex};
use coalesce_abi::{
    AbiValue,
    encode::{
        encode_address, encode_address_array, encode_bytes_array, encode_call,
        encode_consolidation_requests, encode_u64, encode_uint256, encode_uint256_array,
    },
};
use coalesce_consensus::constants::{PUBKEY_HEX_LENGTH, PUBKEY_LENGTH};

use crate::{errors::TransactionError, selectors};

pub type Pubkey = [u8; PUBKEY_LENGTH];

/// Parses a BLS pubkey given as 96 hex characters, with or without `0x`.
pub fn normalize_pubkey(pubkey: &str) -> Result<Pubkey, TransactionError> {
    let trimmed = pubkey.trim();
    let bare = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if bare.len() != PUBKEY_HEX_LENGTH {
        return Err(TransactionError::InvalidPubkeyLength {
            pubkey: pubkey.to_string(),
            len: bare.len(),
        });
    }

    let mut bytes = [0u8; PUBKEY_LENGTH];
    hex::decode_to_slice(bare, &mut bytes)
        .map_err(|_| TransactionError::InvalidPubkeyHex(pubkey.to_string()))?;
    Ok(bytes)
}

/// `requestConsolidation` with every source paired to the same target. The sources are
/// encoded in the order given, so a batch's self-consolidation head stays first.
pub fn request_consolidation_calldata(source_pubkeys: &[Pubkey], target_pubkey: &Pubkey) -> Vec<u8> {
    let requests = source_pubkeys
        .iter()
        .map(|source| (source, target_pubkey))
        .collect::<Vec<_>>();
    encode_call(
        selectors::REQUEST_CONSOLIDATION,
        &[AbiValue::Dynamic(encode_consolidation_requests(&requests))],
    )
}

pub fn link_legacy_validators_calldata(validator_ids: &[u64], pubkeys: &[Pubkey]) -> Vec<u8> {
    let ids = validator_ids
        .iter()
        .map(|id| U256::from(*id))
        .collect::<Vec<_>>();
    encode_call(
        selectors::LINK_LEGACY_VALIDATOR_IDS,
        &[
            AbiValue::Dynamic(encode_uint256_array(&ids)),
            AbiValue::Dynamic(encode_bytes_array(pubkeys)),
        ],
    )
}

pub fn queue_eth_withdrawal_calldata(node_address: Address, amount_wei: U256) -> Vec<u8> {
    encode_call(
        selectors::QUEUE_ETH_WITHDRAWAL,
        &[
            AbiValue::Static(encode_address(node_address)),
            AbiValue::Static(encode_uint256(amount_wei)),
        ],
    )
}

/// Calls proposed through the timelock as one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelockBatch {
    pub targets: Vec<Address>,
    pub values: Vec<U256>,
    pub payloads: Vec<Vec<u8>>,
    pub predecessor: B256,
    pub salt: B256,
}

impl TimelockBatch {
    /// A single zero-value call with no predecessor.
    pub fn single_call(target: Address, payload: Vec<u8>, salt: B256) -> Self {
        Self {
            targets: vec![target],
            values: vec![U256::ZERO],
            payloads: vec![payload],
            predecessor: B256::ZERO,
            salt,
        }
    }

    fn arguments(&self) -> Vec<AbiValue> {
        vec![
            AbiValue::Dynamic(encode_address_array(&self.targets)),
            AbiValue::Dynamic(encode_uint256_array(&self.values)),
            AbiValue::Dynamic(encode_bytes_array(&self.payloads)),
            AbiValue::Static(self.predecessor.0),
            AbiValue::Static(self.salt.0),
        ]
    }

    pub fn schedule_calldata(&self, delay: u64) -> Vec<u8> {
        let mut arguments = self.arguments();
        arguments.push(AbiValue::Static(encode_u64(delay)));
        encode_call(selectors::SCHEDULE_BATCH, &arguments)
    }

    pub fn execute_calldata(&self) -> Vec<u8> {
        encode_call(selectors::EXECUTE_BATCH, &self.arguments())
    }
}
