//! Transaction file formats written for the Safe transaction builder and for direct EOA
//! execution.

use alloy_primitives::Address;
use coalesce_abi::to_prefixed_hex;
use serde::{Deserialize, Serialize};

use crate::constants::TX_BUILDER_VERSION;

/// A call as it appears in every transaction file: decimal value, `0x`-prefixed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub to: String,
    pub value: String,
    pub data: String,
}

impl Transaction {
    pub fn new(to: Address, value: u128, calldata: &[u8]) -> Self {
        Self {
            to: to.to_checksum(None),
            value: value.to_string(),
            data: to_prefixed_hex(calldata),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeMeta {
    pub tx_builder_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Safe Transaction Builder batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeBatchFile {
    pub chain_id: String,
    pub safe_address: String,
    pub meta: SafeMeta,
    pub transactions: Vec<Transaction>,
}

impl SafeBatchFile {
    pub fn new(chain_id: u64, safe_address: Address, transactions: Vec<Transaction>) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            safe_address: safe_address.to_checksum(None),
            meta: SafeMeta {
                tx_builder_version: TX_BUILDER_VERSION.to_string(),
                name: None,
                description: None,
            },
            transactions,
        }
    }

    pub fn with_meta(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.meta.name = Some(name.into());
        self.meta.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub target_pubkey: String,
    pub num_validators: usize,
}

/// Transactions sent directly from an EOA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransactionFile {
    pub chain_id: String,
    pub from: String,
    pub transactions: Vec<RawTransaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BatchMetadata>,
    pub description: String,
}

impl RawTransactionFile {
    pub fn new(
        chain_id: u64,
        from: Address,
        transactions: Vec<RawTransaction>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            from: from.to_checksum(None),
            transactions,
            metadata: None,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::constants::{NODES_MANAGER, OPERATING_ADMIN};

    #[test]
    fn test_safe_batch_file_layout() -> anyhow::Result<()> {
        let file = SafeBatchFile::new(
            1,
            OPERATING_ADMIN,
            vec![Transaction::new(NODES_MANAGER, 3, &[0x66, 0x91, 0x95, 0x4e])],
        )
        .with_meta("Link Validators - Schedule", "Schedule linking of 2 validators via timelock");

        assert_eq!(
            serde_json::to_value(&file)?,
            json!({
                "chainId": "1",
                "safeAddress": "0x2aCA71020De61bb532008049e1Bd41E451aE8AdC",
                "meta": {
                    "txBuilderVersion": "1.16.5",
                    "name": "Link Validators - Schedule",
                    "description": "Schedule linking of 2 validators via timelock",
                },
                "transactions": [{
                    "to": "0x8B71140AD2e5d1E7018d2a7f8a288BD3CD38916F",
                    "value": "3",
                    "data": "0x6691954e",
                }],
            })
        );
        Ok(())
    }

    #[test]
    fn test_safe_meta_omits_missing_fields() -> anyhow::Result<()> {
        let file = SafeBatchFile::new(17000, OPERATING_ADMIN, vec![]);
        let value = serde_json::to_value(&file)?;
        assert_eq!(value["meta"], json!({"txBuilderVersion": "1.16.5"}));
        assert_eq!(value["chainId"], "17000");
        Ok(())
    }

    #[test]
    fn test_raw_transaction_file_layout() -> anyhow::Result<()> {
        let mut file = RawTransactionFile::new(
            1,
            OPERATING_ADMIN,
            vec![RawTransaction {
                transaction: Transaction::new(NODES_MANAGER, 0, &[]),
                description: Some("Link 1 validator(s): ids=[7]".to_string()),
            }],
            "Link 1 target validator(s)",
        );
        file.metadata = Some(BatchMetadata {
            target_pubkey: "0xab".to_string(),
            num_validators: 3,
        });

        let value = serde_json::to_value(&file)?;
        assert_eq!(value["from"], "0x2aCA71020De61bb532008049e1Bd41E451aE8AdC");
        assert_eq!(
            value["transactions"][0],
            json!({
                "to": "0x8B71140AD2e5d1E7018d2a7f8a288BD3CD38916F",
                "value": "0",
                "data": "0x",
                "description": "Link 1 validator(s): ids=[7]",
            })
        );
        assert_eq!(value["metadata"]["num_validators"], 3);
        assert_eq!(serde_json::from_value::<RawTransactionFile>(value)?, file);
        Ok(())
    }
}
