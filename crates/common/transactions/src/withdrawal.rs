//! Files for a submarine withdrawal, executed directly from the operator's admin account:
//! a link for every pod target, the consolidation batches, and the post-sweep
//! `queueETHWithdrawal` calls.

use std::collections::HashSet;

use alloy_primitives::{Address, U256};
use coalesce_consensus::{
    balance::{Gwei, gwei_to_eth},
    constants::GWEI_PER_ETH,
};
use coalesce_planner::submarine::{PodSummary, PodWithdrawal, SubmarinePlan};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    calldata::{link_legacy_validators_calldata, normalize_pubkey, queue_eth_withdrawal_calldata},
    consolidation::consolidation_transaction,
    constants::NODES_MANAGER,
    errors::TransactionError,
    files::{RawTransaction, RawTransactionFile, Transaction},
};

pub const LINK_VALIDATORS_FILE: &str = "link-validators.json";
pub const QUEUE_WITHDRAWALS_FILE: &str = "post-sweep/queue-withdrawals.json";

pub fn consolidation_file_name(index: usize) -> String {
    format!("consolidation-txns-{index}.json")
}

/// One `linkLegacyValidatorIds` call covering every pod target, since each target heads all
/// of its pod's batches. `None` when the plan uses no pods.
pub fn submarine_link_file(
    plan: &SubmarinePlan,
    chain_id: u64,
    from: Address,
) -> Result<Option<RawTransactionFile>, TransactionError> {
    let mut seen_ids = HashSet::new();
    let mut seen_pubkeys = HashSet::new();
    let mut ids = Vec::new();
    let mut pubkeys = Vec::new();
    for target in plan.targets() {
        if seen_ids.insert(target.record.id) && seen_pubkeys.insert(target.pubkey_key.clone()) {
            ids.push(target.record.id);
            pubkeys.push(normalize_pubkey(&target.record.pubkey)?);
        }
    }
    if ids.is_empty() {
        return Ok(None);
    }

    let calldata = link_legacy_validators_calldata(&ids, &pubkeys);
    let id_list = ids.iter().map(u64::to_string).collect::<Vec<_>>().join(", ");
    Ok(Some(RawTransactionFile::new(
        chain_id,
        from,
        vec![RawTransaction {
            transaction: Transaction::new(NODES_MANAGER, 0, &calldata),
            description: Some(format!("Link {} validator(s): ids=[{id_list}]", ids.len())),
        }],
        format!("Link {} src[0] validator(s) via ADMIN_EOA", ids.len()),
    )))
}

/// One raw transaction file per consolidation batch, numbered from 1 across all pods.
pub fn submarine_consolidation_files(
    plan: &SubmarinePlan,
    chain_id: u64,
    from: Address,
) -> Result<Vec<RawTransactionFile>, TransactionError> {
    plan.batches()
        .iter()
        .enumerate()
        .map(|(position, batch)| {
            let pubkeys = batch
                .sources
                .iter()
                .map(|source| source.record.pubkey.as_str())
                .collect::<Vec<_>>();
            let encoded = consolidation_transaction(
                NODES_MANAGER,
                &batch.target.record.pubkey,
                &pubkeys,
                plan.fee_per_request_wei,
            )?;

            let mut file = RawTransactionFile::new(
                chain_id,
                from,
                vec![RawTransaction {
                    transaction: encoded.transaction.clone(),
                    description: None,
                }],
                format!(
                    "Submarine Consolidation Batch {}: {} sources into target (vals[0])",
                    position + 1,
                    batch.genuine_sources().len()
                ),
            );
            file.metadata = Some(encoded.metadata());
            Ok(file)
        })
        .collect()
}

/// A `queueETHWithdrawal` for one pod. Without a known node contract the call cannot be
/// encoded and the entry is flagged for manual resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueWithdrawalEntry {
    pub target_pubkey: String,
    pub target_id: u64,
    pub withdrawal_amount_gwei: Gwei,
    pub withdrawal_amount_eth: f64,
    pub node_address: Option<Address>,
    pub to: String,
    pub value: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_resolution: Option<bool>,
}

impl QueueWithdrawalEntry {
    pub fn from_withdrawal(withdrawal: &PodWithdrawal) -> Self {
        let target = &withdrawal.target.record;
        let node_address = target
            .node_address
            .filter(|node_address| !node_address.is_zero());
        let (data, requires_resolution) = match node_address {
            Some(node_address) => {
                let amount_wei = U256::from(withdrawal.withdrawal) * U256::from(GWEI_PER_ETH);
                let calldata = queue_eth_withdrawal_calldata(node_address, amount_wei);
                (Transaction::new(NODES_MANAGER, 0, &calldata).data, None)
            }
            None => {
                warn!("No node address for target id={}, withdrawal needs resolution", target.id);
                ("0x".to_string(), Some(true))
            }
        };

        Self {
            target_pubkey: target.pubkey.clone(),
            target_id: target.id,
            withdrawal_amount_gwei: withdrawal.withdrawal,
            withdrawal_amount_eth: gwei_to_eth(withdrawal.withdrawal),
            node_address,
            to: NODES_MANAGER.to_checksum(None),
            value: "0".to_string(),
            data,
            requires_resolution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueWithdrawalFile {
    pub chain_id: String,
    pub from: String,
    pub transactions: Vec<QueueWithdrawalEntry>,
    pub description: String,
}

pub fn queue_withdrawals_file(plan: &SubmarinePlan, chain_id: u64, from: Address) -> QueueWithdrawalFile {
    let transactions = plan
        .withdrawals
        .iter()
        .map(QueueWithdrawalEntry::from_withdrawal)
        .collect::<Vec<_>>();
    let unresolved = transactions
        .iter()
        .filter(|entry| entry.requires_resolution.is_some())
        .count();
    info!(
        "Queued {} withdrawals, {unresolved} awaiting node resolution",
        transactions.len()
    );

    QueueWithdrawalFile {
        chain_id: chain_id.to_string(),
        from: from.to_checksum(None),
        description: format!(
            "Queue ETH withdrawals for {} pod(s) after beacon chain consolidation + sweep",
            transactions.len()
        ),
        transactions,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCounts {
    pub linking: usize,
    pub consolidation: usize,
    pub queue_withdrawals: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationCounts {
    pub total_sources: usize,
    pub num_transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmarineFiles {
    pub link_validators: Option<String>,
    pub consolidation_txns: Vec<String>,
    pub queue_withdrawals: String,
}

/// `submarine-plan.json`: what was planned and the order to execute the files in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmarineManifest {
    #[serde(rename = "type")]
    pub kind: String,
    pub requested_amount_eth: f64,
    pub total_withdrawal_eth: f64,
    pub num_pods_used: usize,
    pub pods: Vec<PodSummary>,
    pub transactions: TransactionCounts,
    pub consolidation: ConsolidationCounts,
    pub files: SubmarineFiles,
    pub execution_order: Vec<String>,
}

impl SubmarineManifest {
    pub fn new(plan: &SubmarinePlan, needs_linking: bool, num_batches: usize) -> Self {
        let linking = usize::from(needs_linking);
        let pods = plan.pod_summaries();
        let consolidation_txns = (1..=num_batches).map(consolidation_file_name).collect::<Vec<_>>();

        let mut steps = Vec::new();
        if needs_linking {
            steps.push(format!("Execute {LINK_VALIDATORS_FILE} from ADMIN_EOA"));
        }
        steps.extend(
            consolidation_txns
                .iter()
                .map(|file| format!("Execute {file} from ADMIN_EOA")),
        );
        steps.push(
            "Wait for beacon chain consolidation + sweep (excess above 2048 ETH is auto-withdrawn)"
                .to_string(),
        );
        steps.push(
            "Execute queue-withdrawals.json from ADMIN_EOA (queueETHWithdrawal for each pod)"
                .to_string(),
        );
        steps.push(
            "Wait for EigenLayer withdrawal delay, then completeQueuedETHWithdrawals".to_string(),
        );
        let execution_order = steps
            .into_iter()
            .enumerate()
            .map(|(position, step)| format!("{}. {step}", position + 1))
            .collect();

        Self {
            kind: "submarine_withdrawal".to_string(),
            requested_amount_eth: gwei_to_eth(plan.requested_amount),
            total_withdrawal_eth: gwei_to_eth(plan.total_withdrawal),
            num_pods_used: pods.len(),
            transactions: TransactionCounts {
                linking,
                consolidation: num_batches,
                queue_withdrawals: pods.len(),
                total: linking + num_batches + pods.len(),
            },
            consolidation: ConsolidationCounts {
                total_sources: plan.total_sources(),
                num_transactions: num_batches,
            },
            files: SubmarineFiles {
                link_validators: needs_linking.then(|| LINK_VALIDATORS_FILE.to_string()),
                consolidation_txns,
                queue_withdrawals: QUEUE_WITHDRAWALS_FILE.to_string(),
            },
            pods,
            execution_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use coalesce_abi::{AbiDecoder, decode_hex};
    use coalesce_consensus::{credentials::format_full_credentials, validator::ValidatorRecord};
    use coalesce_planner::submarine::SubmarineConfig;
    use tracing_test::traced_test;

    use super::*;
    use crate::{constants::OPERATING_ADMIN, selectors};

    const NODE: Address = address!("0x00000000000000000000000000000000000000aa");

    /// One pod with a 2000 ETH compounding target and ten 32 ETH sources.
    fn records() -> Vec<ValidatorRecord> {
        let pod = Address::with_last_byte(1);
        let mut records = vec![{
            let mut target = ValidatorRecord::new(
                100,
                format!("0x{:096x}", 100),
                format_full_credentials(&pod, 2),
            )
            .with_balance_eth(2000.0)
            .as_existing_target();
            target.node_address = Some(NODE);
            target
        }];
        for id in 0..10u64 {
            records.push(
                ValidatorRecord::new(id, format!("0x{:096x}", id + 1), format_full_credentials(&pod, 1))
                    .with_balance_eth(32.0),
            );
        }
        records
    }

    fn plan(amount_eth: f64, batch_size: usize) -> anyhow::Result<SubmarinePlan> {
        let config = SubmarineConfig {
            batch_size,
            ..SubmarineConfig::new(amount_eth)
        };
        Ok(SubmarinePlan::build(records(), &config)?)
    }

    #[test]
    fn test_link_file_targets_each_pod() -> anyhow::Result<()> {
        let plan = plan(100.0, 150)?;
        let file = submarine_link_file(&plan, 1, OPERATING_ADMIN)?.ok_or(anyhow::anyhow!("no link"))?;
        assert_eq!(file.description, "Link 1 src[0] validator(s) via ADMIN_EOA");
        assert_eq!(
            file.transactions[0].description.as_deref(),
            Some("Link 1 validator(s): ids=[100]")
        );

        let calldata = decode_hex(&file.transactions[0].transaction.data)?;
        let decoder = AbiDecoder::from_calldata(&calldata, selectors::LINK_LEGACY_VALIDATOR_IDS)?;
        assert_eq!(decoder.uint256_array(decoder.argument(0)?)?, vec![U256::from(100u64)]);
        Ok(())
    }

    #[test]
    fn test_consolidation_files_are_numbered_across_batches() -> anyhow::Result<()> {
        // 100 ETH over a 2000 ETH target needs ceil(148 / 32) = 5 sources, 2 per batch.
        let plan = plan(100.0, 3)?;
        let files = submarine_consolidation_files(&plan, 1, OPERATING_ADMIN)?;
        let descriptions = files
            .iter()
            .map(|file| file.description.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            descriptions,
            vec![
                "Submarine Consolidation Batch 1: 2 sources into target (vals[0])",
                "Submarine Consolidation Batch 2: 2 sources into target (vals[0])",
                "Submarine Consolidation Batch 3: 1 sources into target (vals[0])",
            ]
        );
        let metadata = files[2].metadata.as_ref().ok_or(anyhow::anyhow!("no metadata"))?;
        assert_eq!(metadata.num_validators, 2);
        assert_eq!(files[0].transactions[0].transaction.value, "3");
        Ok(())
    }

    #[test]
    fn test_queue_withdrawal_encodes_known_node() -> anyhow::Result<()> {
        let plan = plan(100.0, 150)?;
        let file = queue_withdrawals_file(&plan, 1, OPERATING_ADMIN);
        let entry = &file.transactions[0];
        // 2000 + 5 * 32 - 2048
        assert_eq!(entry.withdrawal_amount_gwei, 112_000_000_000);
        assert_eq!(entry.node_address, Some(NODE));
        assert_eq!(entry.requires_resolution, None);

        let calldata = decode_hex(&entry.data)?;
        let decoder = AbiDecoder::from_calldata(&calldata, selectors::QUEUE_ETH_WITHDRAWAL)?;
        assert_eq!(decoder.address(0)?, NODE);
        assert_eq!(
            decoder.uint256(32)?,
            U256::from(112u64) * U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(
            file.description,
            "Queue ETH withdrawals for 1 pod(s) after beacon chain consolidation + sweep"
        );
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_queue_withdrawal_without_node_needs_resolution() -> anyhow::Result<()> {
        let mut records = records();
        records[0].node_address = None;
        let plan = SubmarinePlan::build(records, &SubmarineConfig::new(100.0))?;
        let file = queue_withdrawals_file(&plan, 1, OPERATING_ADMIN);

        let value = serde_json::to_value(&file.transactions[0])?;
        assert_eq!(value["data"], "0x");
        assert_eq!(value["requires_resolution"], true);
        assert!(value["node_address"].is_null());
        assert!(logs_contain("withdrawal needs resolution"));
        Ok(())
    }

    #[test]
    fn test_manifest_execution_order() -> anyhow::Result<()> {
        let plan = plan(100.0, 3)?;
        let manifest = SubmarineManifest::new(&plan, true, 3);
        assert_eq!(manifest.transactions.total, 5);
        assert_eq!(manifest.consolidation.total_sources, 5);
        assert_eq!(manifest.files.link_validators.as_deref(), Some(LINK_VALIDATORS_FILE));
        assert_eq!(manifest.execution_order[0], "1. Execute link-validators.json from ADMIN_EOA");
        assert_eq!(
            manifest.execution_order[3],
            "4. Execute consolidation-txns-3.json from ADMIN_EOA"
        );
        assert_eq!(manifest.execution_order.len(), 7);

        let value = serde_json::to_value(&manifest)?;
        assert_eq!(value["type"], "submarine_withdrawal");
        assert_eq!(value["requested_amount_eth"], 100.0);
        Ok(())
    }
}
