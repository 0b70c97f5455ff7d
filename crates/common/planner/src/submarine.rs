//! Withdrawing a large amount of ETH by consolidating a pod's validators past the
//! protocol's effective balance cap, so the sweep pays out the excess.

use alloy_primitives::Address;
use coalesce_consensus::{
    balance::{Gwei, eth_to_gwei, gwei_to_eth},
    constants::{MAX_EFFECTIVE_BALANCE_ELECTRA, MIN_ACTIVATION_BALANCE},
    validator::ValidatorRecord,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    batcher::ConsolidationBatch,
    config::DEFAULT_FEE_PER_REQUEST_WEI,
    errors::{ConfigError, PlanError},
    output::{ConsolidationData, ConsolidationEntry},
    plan::PlanSummary,
    pods::{EigenPodGroup, ExcludedValidator, PlannedValidator, PodGroups, group_by_pod, prepare_validators},
};

/// Validators per transaction including the target at position 0.
pub const DEFAULT_SUBMARINE_BATCH_SIZE: usize = 150;
pub const MIN_WITHDRAWAL_AMOUNT: Gwei = MIN_ACTIVATION_BALANCE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmarineConfig {
    pub amount_eth: f64,
    pub batch_size: usize,
    pub fee_per_request_wei: u64,
}

impl SubmarineConfig {
    pub fn new(amount_eth: f64) -> Self {
        Self {
            amount_eth,
            batch_size: DEFAULT_SUBMARINE_BATCH_SIZE,
            fee_per_request_wei: DEFAULT_FEE_PER_REQUEST_WEI,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !eth_to_gwei(self.amount_eth).is_some_and(|amount| amount >= MIN_WITHDRAWAL_AMOUNT) {
            return Err(ConfigError::InvalidWithdrawalAmount {
                value: self.amount_eth,
                min: gwei_to_eth(MIN_WITHDRAWAL_AMOUNT),
            });
        }
        if self.batch_size < 2 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }

    pub fn amount(&self) -> Gwei {
        eth_to_gwei(self.amount_eth).unwrap_or_default()
    }
}

/// What a pod could contribute if every one of its sources went into a single target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodEvaluation {
    pub pod: Address,
    pub total_validators: usize,
    pub total_balance: Gwei,
    pub compounding_count: usize,
    pub target: Option<PlannedValidator>,
    pub is_target_0x02: bool,
    pub available_sources: usize,
    pub max_withdrawal: Gwei,
}

/// Picks the richest 0x02 validator as target, falling back to the richest 0x01 one.
pub fn evaluate_pod(group: &EigenPodGroup) -> PodEvaluation {
    let compounding_count = group
        .members
        .iter()
        .filter(|member| member.is_compounding())
        .count();

    let target = group
        .members
        .iter()
        .sorted_by_key(|member| {
            (
                !member.is_compounding(),
                std::cmp::Reverse(member.balance),
                member.pubkey_key.clone(),
            )
        })
        .next()
        .cloned();

    let available_sources = target
        .as_ref()
        .map(|target| source_candidates(group, target).count())
        .unwrap_or(0);
    let max_withdrawal = target
        .as_ref()
        .map(|target| {
            (target.balance + available_sources as Gwei * MIN_ACTIVATION_BALANCE)
                .saturating_sub(MAX_EFFECTIVE_BALANCE_ELECTRA)
        })
        .unwrap_or(0);

    PodEvaluation {
        pod: group.pod,
        total_validators: group.members.len(),
        total_balance: group.members.iter().map(|member| member.balance).sum(),
        compounding_count,
        is_target_0x02: target.as_ref().is_some_and(PlannedValidator::is_compounding),
        target,
        available_sources,
        max_withdrawal,
    }
}

fn source_candidates<'a>(
    group: &'a EigenPodGroup,
    target: &'a PlannedValidator,
) -> impl Iterator<Item = &'a PlannedValidator> {
    group
        .sources()
        .filter(move |member| member.pubkey_key != target.pubkey_key)
}

/// The `count` lowest-balance sources of the pod, never the target or an existing 0x02 target.
pub fn select_sources(
    group: &EigenPodGroup,
    target: &PlannedValidator,
    count: usize,
) -> Vec<PlannedValidator> {
    source_candidates(group, target)
        .sorted_by_key(|member| (member.balance, member.pubkey_key.clone()))
        .take(count)
        .cloned()
        .collect()
}

/// One pod's share of the withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodWithdrawal {
    pub pod: Address,
    pub target: PlannedValidator,
    pub is_target_0x02: bool,
    pub sources: Vec<PlannedValidator>,
    /// Target balance plus one activation balance per source.
    pub post_consolidation_balance: Gwei,
    pub withdrawal: Gwei,
}

impl PodWithdrawal {
    /// Splits the pod's sources into transactions of `batch_size` validators, each headed by
    /// the target. Post-consolidation balances accumulate across the pod's batches.
    pub fn batches(&self, batch_size: usize) -> Vec<ConsolidationBatch> {
        let mut running_balance = self.target.balance;
        self.sources
            .chunks(batch_size.saturating_sub(1).max(1))
            .map(|chunk| {
                let mut batch = ConsolidationBatch::new(self.target.clone(), chunk.to_vec());
                running_balance += chunk.iter().map(|source| source.balance).sum::<Gwei>();
                batch.post_consolidation_balance = running_balance;
                batch
            })
            .collect()
    }

    fn consolidation_entry(&self) -> ConsolidationEntry {
        let mut batch = ConsolidationBatch::new(self.target.clone(), self.sources.clone());
        batch.post_consolidation_balance = self.post_consolidation_balance;
        ConsolidationEntry {
            withdrawal_amount_gwei: Some(self.withdrawal),
            ..ConsolidationEntry::from_batch(&batch)
        }
    }
}

/// Walks pods from the largest possible withdrawal down, taking only as many sources from the
/// last pod as the remaining amount needs.
pub fn select_pods_for_withdrawal(groups: &PodGroups, amount: Gwei) -> Vec<PodWithdrawal> {
    let candidates = groups
        .iter()
        .map(|group| (group, evaluate_pod(group)))
        .filter(|(_, evaluation)| evaluation.max_withdrawal > 0)
        .sorted_by_key(|(_, evaluation)| std::cmp::Reverse(evaluation.max_withdrawal));

    let mut remaining = amount;
    let mut withdrawals = Vec::new();
    for (group, evaluation) in candidates {
        if remaining == 0 {
            break;
        }
        let Some(target) = evaluation.target else {
            continue;
        };

        let needed = remaining
            .saturating_add(MAX_EFFECTIVE_BALANCE_ELECTRA)
            .saturating_sub(target.balance)
            .div_ceil(MIN_ACTIVATION_BALANCE);
        let count = usize::try_from(needed)
            .unwrap_or(usize::MAX)
            .min(evaluation.available_sources);
        let sources = select_sources(group, &target, count);

        let post_consolidation_balance =
            target.balance + sources.len() as Gwei * MIN_ACTIVATION_BALANCE;
        let withdrawal = post_consolidation_balance.saturating_sub(MAX_EFFECTIVE_BALANCE_ELECTRA);
        remaining = remaining.saturating_sub(withdrawal);

        info!(
            "Pod {}: {} sources into {}, withdrawing {:.2} ETH",
            group.pod,
            sources.len(),
            target.record.short_pubkey(),
            gwei_to_eth(withdrawal)
        );
        withdrawals.push(PodWithdrawal {
            pod: group.pod,
            is_target_0x02: evaluation.is_target_0x02,
            target,
            sources,
            post_consolidation_balance,
            withdrawal,
        });
    }

    withdrawals
}

/// Per-pod row of `submarine-plan.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodSummary {
    pub eigenpod: Address,
    pub target_pubkey: String,
    pub target_id: u64,
    pub target_balance_eth: f64,
    pub is_target_0x02: bool,
    pub num_sources: usize,
    pub post_consolidation_eth: f64,
    pub withdrawal_eth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmarinePlan {
    pub requested_amount: Gwei,
    pub total_withdrawal: Gwei,
    pub evaluations: Vec<PodEvaluation>,
    pub withdrawals: Vec<PodWithdrawal>,
    pub excluded: Vec<ExcludedValidator>,
    pub batch_size: usize,
    pub fee_per_request_wei: u64,
}

impl SubmarinePlan {
    pub fn build(records: Vec<ValidatorRecord>, config: &SubmarineConfig) -> Result<Self, PlanError> {
        config.validate()?;
        let requested_amount = config.amount();

        let prepared = prepare_validators(records, None)?;
        let groups = group_by_pod(prepared.validators);
        let evaluations = groups.iter().map(evaluate_pod).collect::<Vec<_>>();
        info!(
            "Evaluated {} pods, {:.2} ETH withdrawable at most",
            evaluations.len(),
            gwei_to_eth(evaluations.iter().map(|evaluation| evaluation.max_withdrawal).sum())
        );

        let withdrawals = select_pods_for_withdrawal(&groups, requested_amount);
        let total_withdrawal = withdrawals.iter().map(|withdrawal| withdrawal.withdrawal).sum();
        if total_withdrawal < requested_amount {
            warn!(
                "Only {:.2} of {:.2} ETH can be withdrawn with the available pods",
                gwei_to_eth(total_withdrawal),
                gwei_to_eth(requested_amount)
            );
        }

        Ok(Self {
            requested_amount,
            total_withdrawal,
            evaluations,
            withdrawals,
            excluded: prepared.excluded,
            batch_size: config.batch_size,
            fee_per_request_wei: config.fee_per_request_wei,
        })
    }

    pub fn total_sources(&self) -> usize {
        self.withdrawals
            .iter()
            .map(|withdrawal| withdrawal.sources.len())
            .sum()
    }

    /// Every consolidation transaction in execution order, pod by pod.
    pub fn batches(&self) -> Vec<ConsolidationBatch> {
        self.withdrawals
            .iter()
            .flat_map(|withdrawal| withdrawal.batches(self.batch_size))
            .collect()
    }

    pub fn targets(&self) -> Vec<&PlannedValidator> {
        self.withdrawals
            .iter()
            .map(|withdrawal| &withdrawal.target)
            .collect()
    }

    pub fn pod_summaries(&self) -> Vec<PodSummary> {
        self.withdrawals
            .iter()
            .map(|withdrawal| PodSummary {
                eigenpod: withdrawal.pod,
                target_pubkey: withdrawal.target.record.pubkey.clone(),
                target_id: withdrawal.target.record.id,
                target_balance_eth: gwei_to_eth(withdrawal.target.balance),
                is_target_0x02: withdrawal.is_target_0x02,
                num_sources: withdrawal.sources.len(),
                post_consolidation_eth: gwei_to_eth(withdrawal.post_consolidation_balance),
                withdrawal_eth: gwei_to_eth(withdrawal.withdrawal),
            })
            .collect()
    }

    /// One entry per pod, each listing the target followed by all of its sources.
    pub fn to_consolidation_data(&self) -> ConsolidationData {
        let consolidations = self
            .withdrawals
            .iter()
            .map(PodWithdrawal::consolidation_entry)
            .collect::<Vec<_>>();
        let summary = PlanSummary {
            total_targets: self.withdrawals.len(),
            total_sources: consolidations.iter().map(|entry| entry.source_count).sum(),
            total_eth_consolidated: gwei_to_eth(
                self.withdrawals
                    .iter()
                    .map(|withdrawal| withdrawal.post_consolidation_balance)
                    .sum(),
            ),
            existing_0x02_targets_used: self
                .withdrawals
                .iter()
                .filter(|withdrawal| withdrawal.target.is_existing_target())
                .count(),
            withdrawal_credential_groups: self.withdrawals.len(),
            ..Default::default()
        };
        ConsolidationData::new(consolidations, summary)
    }
}
