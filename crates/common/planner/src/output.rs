//! JSON documents handed to the downstream transaction tooling.

use std::collections::HashSet;

use alloy_primitives::B256;
use coalesce_consensus::{
    balance::{Gwei, gwei_to_eth},
    constants::ETH1_ADDRESS_WITHDRAWAL_PREFIX,
    credentials::format_full_credentials,
    sweep::format_duration,
};
use serde::{Deserialize, Serialize};

use crate::{
    batcher::ConsolidationBatch,
    plan::{ConsolidationPlan, PlanSummary},
    pods::PlannedValidator,
    validation::ValidationReport,
};

/// Full 32-byte credential for a validator, keeping its own type byte. Records that only
/// carried the bare pod address are rendered as 0x01.
fn full_credentials(validator: &PlannedValidator) -> String {
    let prefix = validator
        .record
        .credential_prefix()
        .unwrap_or(ETH1_ADDRESS_WITHDRAWAL_PREFIX);
    format_full_credentials(&validator.pod, prefix)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEntry {
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub validator_index: Option<u64>,
    pub id: u64,
    #[serde(default)]
    pub current_balance_eth: f64,
    #[serde(default)]
    pub is_existing_0x02: bool,
    #[serde(default)]
    pub withdrawal_credentials: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_bucket: Option<String>,
}

impl TargetEntry {
    pub fn from_validator(validator: &PlannedValidator) -> Self {
        Self {
            pubkey: validator.record.pubkey.clone(),
            validator_index: validator.record.beacon_index,
            id: validator.record.id,
            current_balance_eth: gwei_to_eth(validator.balance),
            is_existing_0x02: validator.is_existing_target(),
            withdrawal_credentials: full_credentials(validator),
            sweep_bucket: validator
                .bucket_index
                .map(|bucket_index| format!("bucket_{bucket_index}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(default)]
    pub pubkey: String,
    #[serde(default)]
    pub validator_index: Option<u64>,
    pub id: u64,
    #[serde(default)]
    pub balance_eth: f64,
    #[serde(default)]
    pub withdrawal_credentials: String,
}

impl SourceEntry {
    pub fn from_validator(validator: &PlannedValidator) -> Self {
        Self {
            pubkey: validator.record.pubkey.clone(),
            validator_index: validator.record.beacon_index,
            id: validator.record.id,
            balance_eth: gwei_to_eth(validator.balance),
            withdrawal_credentials: full_credentials(validator),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationEntry {
    pub target: TargetEntry,
    /// Every request of the batch; the first entry is the target consolidating into itself.
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub source_count: usize,
    #[serde(default)]
    pub post_consolidation_balance_eth: f64,
    /// Excess above the protocol cap that the sweep will pay out, for withdrawal plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_amount_gwei: Option<Gwei>,
}

impl ConsolidationEntry {
    pub fn from_batch(batch: &ConsolidationBatch) -> Self {
        let sources = batch
            .sources
            .iter()
            .map(SourceEntry::from_validator)
            .collect::<Vec<_>>();
        Self {
            target: TargetEntry::from_validator(&batch.target),
            source_count: sources.len(),
            sources,
            post_consolidation_balance_eth: gwei_to_eth(batch.post_consolidation_balance),
            withdrawal_amount_gwei: None,
        }
    }

    pub fn target_pubkey(&self) -> &str {
        &self.target.pubkey
    }
}

/// `consolidation-data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationData {
    #[serde(default)]
    pub num_consolidations: usize,
    pub consolidations: Vec<ConsolidationEntry>,
    #[serde(default)]
    pub summary: PlanSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

impl ConsolidationData {
    pub fn new(consolidations: Vec<ConsolidationEntry>, summary: PlanSummary) -> Self {
        Self {
            num_consolidations: consolidations.len(),
            consolidations,
            summary,
            validation: None,
        }
    }

    pub fn from_plan(plan: &ConsolidationPlan) -> Self {
        Self {
            validation: Some(plan.validation.clone()),
            ..Self::new(
                plan.consolidations
                    .iter()
                    .map(ConsolidationEntry::from_batch)
                    .collect(),
                plan.summary.clone(),
            )
        }
    }
}

/// One row of `targets.json`, consumed when linking target validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: u64,
    pub pubkey: String,
    pub pubkey_hash: Option<B256>,
    pub validator_index: Option<u64>,
    pub estimated_sweep_seconds: Option<u64>,
    pub estimated_sweep_time: Option<String>,
    pub bucket_index: Option<usize>,
    pub current_balance_eth: f64,
    pub withdrawal_credentials: String,
}

impl TargetRecord {
    pub fn from_validator(validator: &PlannedValidator) -> Self {
        let estimated_sweep_seconds = validator.seconds_until_sweep();
        Self {
            id: validator.record.id,
            pubkey: validator.record.pubkey.clone(),
            pubkey_hash: validator.record.pubkey_hash(),
            validator_index: validator.record.beacon_index,
            estimated_sweep_seconds,
            estimated_sweep_time: estimated_sweep_seconds.map(format_duration),
            bucket_index: validator.bucket_index,
            current_balance_eth: gwei_to_eth(validator.balance),
            withdrawal_credentials: full_credentials(validator),
        }
    }
}

/// Distinct batch targets ordered by bucket, then by time until their sweep.
pub fn collect_target_records(batches: &[ConsolidationBatch]) -> Vec<TargetRecord> {
    let mut seen = HashSet::new();
    let mut records = batches
        .iter()
        .filter(|batch| seen.insert(batch.target.pubkey_key.as_str()))
        .map(|batch| TargetRecord::from_validator(&batch.target))
        .collect::<Vec<_>>();
    records.sort_by_key(|record| {
        (
            record.bucket_index.unwrap_or_default(),
            record.estimated_sweep_seconds.unwrap_or_default(),
        )
    });
    records
}
