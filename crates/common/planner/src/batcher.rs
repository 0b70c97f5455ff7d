use std::collections::HashSet;

use alloy_primitives::Address;
use coalesce_consensus::{
    balance::{Gwei, consolidation_capacity},
    constants::MIN_ACTIVATION_BALANCE,
};
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    pods::{PlannedValidator, PodGroups},
    targets::SelectedTarget,
};

/// One consolidation transaction: `sources[0]` is always the target itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationBatch {
    pub target: PlannedValidator,
    pub sources: Vec<PlannedValidator>,
    pub post_consolidation_balance: Gwei,
    pub bucket_index: Option<usize>,
    pub pod: Address,
}

impl ConsolidationBatch {
    /// Builds a batch headed by `target`, crediting each source's balance to it.
    pub fn new(target: PlannedValidator, genuine_sources: Vec<PlannedValidator>) -> Self {
        let post_consolidation_balance = target.balance
            + genuine_sources
                .iter()
                .map(|source| source.balance)
                .sum::<Gwei>();
        let mut sources = Vec::with_capacity(genuine_sources.len() + 1);
        sources.push(target.clone());
        sources.extend(genuine_sources);

        Self {
            bucket_index: target.bucket_index,
            pod: target.pod,
            target,
            sources,
            post_consolidation_balance,
        }
    }

    pub fn target_balance(&self) -> Gwei {
        self.target.balance
    }

    /// Sources after the self-consolidation head.
    pub fn genuine_sources(&self) -> &[PlannedValidator] {
        self.sources.get(1..).unwrap_or_default()
    }

    /// Balance of every entry in `sources`, the head included.
    pub fn source_total(&self) -> Gwei {
        self.sources.iter().map(|source| source.balance).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_target_balance: Gwei,
    /// Validators per transaction including the target's self-consolidation slot.
    pub batch_size: usize,
    /// Genuine sources across the whole plan.
    pub requested_sources: usize,
}

/// Candidate order within a pod: existing 0x02 targets first, then ascending balance,
/// then pubkey. The first candidate with room becomes the next batch target.
pub fn order_candidates(members: &[PlannedValidator]) -> Vec<&PlannedValidator> {
    members
        .iter()
        .sorted_by_key(|member| {
            (
                !member.is_existing_target(),
                member.balance,
                member.pubkey_key.clone(),
            )
        })
        .collect()
}

/// Greedily packs sources into batches, pod by pod, until the requested source count is met.
///
/// A validator is consumed at most once: a formed batch removes its target and sources from
/// the pod's pool, and a target is never reused anywhere in the plan.
pub fn build_batches(
    groups: &PodGroups,
    selected_targets: &[SelectedTarget],
    limits: &BatchLimits,
) -> Vec<ConsolidationBatch> {
    let source_slots = limits.batch_size.saturating_sub(1);
    let mut batches = Vec::new();
    let mut used_targets: HashSet<String> = HashSet::new();
    let mut planned_sources = 0;

    for selected in selected_targets {
        if planned_sources >= limits.requested_sources {
            break;
        }
        let Some(group) = groups.get(&selected.pod) else {
            continue;
        };
        if !group.has_sources() {
            continue;
        }

        let mut available = order_candidates(&group.members);

        while planned_sources < limits.requested_sources
            && available.len() >= 2
            && available.iter().any(|member| !member.is_existing_target())
        {
            let Some(target_position) = available.iter().position(|candidate| {
                !used_targets.contains(&candidate.pubkey_key)
                    && consolidation_capacity(
                        candidate.balance,
                        limits.max_target_balance,
                        MIN_ACTIVATION_BALANCE,
                    ) > 0
            }) else {
                break;
            };
            let target = available[target_position];
            used_targets.insert(target.pubkey_key.clone());

            let mut running_balance = target.balance;
            let mut chosen: Vec<&PlannedValidator> = Vec::new();
            for (position, &source) in available.iter().enumerate() {
                if position == target_position || source.is_existing_target() {
                    continue;
                }
                if chosen.len() >= source_slots
                    || planned_sources + chosen.len() >= limits.requested_sources
                {
                    break;
                }
                if running_balance + source.balance <= limits.max_target_balance {
                    running_balance += source.balance;
                    chosen.push(source);
                }
            }

            if chosen.is_empty() {
                debug!(
                    "No source fits under target {} in pod 0x{}",
                    target.record.short_pubkey(),
                    group.pod_key()
                );
                available.remove(target_position);
                continue;
            }

            planned_sources += chosen.len();
            let consumed = chosen
                .iter()
                .map(|source| source.pubkey_key.as_str())
                .chain([target.pubkey_key.as_str()])
                .collect::<HashSet<_>>();
            let batch = ConsolidationBatch::new(
                target.clone(),
                chosen.iter().map(|&source| source.clone()).collect(),
            );
            info!(
                "Batch {}: {} sources into {} (bucket {:?}), post balance {} gwei",
                batches.len() + 1,
                chosen.len(),
                target.record.short_pubkey(),
                batch.bucket_index,
                batch.post_consolidation_balance
            );
            batches.push(batch);

            available.retain(|member| !consumed.contains(member.pubkey_key.as_str()));
        }
    }

    batches
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use coalesce_consensus::{
        constants::GWEI_PER_ETH, credentials::format_full_credentials,
        validator::ValidatorRecord,
    };

    use super::*;
    use crate::{pods::group_by_pod, targets::select_targets};

    const POD_A: Address = address!("0x00000000000000000000000000000000000000aa");
    const POD_B: Address = address!("0x00000000000000000000000000000000000000bb");

    fn validator(id: u64, pod: Address, balance_eth: u64) -> PlannedValidator {
        let record = ValidatorRecord::new(
            id,
            format!("0x{id:096x}"),
            format_full_credentials(&pod, 1),
        )
        .with_balance_eth(balance_eth as f64);
        PlannedValidator {
            pubkey_key: record.normalized_pubkey(),
            record,
            balance: balance_eth * GWEI_PER_ETH,
            pod,
            sweep: None,
            bucket_index: Some(0),
        }
    }

    fn existing_target(id: u64, pod: Address, balance_eth: u64) -> PlannedValidator {
        let mut validator = validator(id, pod, balance_eth);
        validator.record = validator.record.as_existing_target();
        validator
    }

    fn plan(validators: Vec<PlannedValidator>, limits: BatchLimits) -> Vec<ConsolidationBatch> {
        let groups = group_by_pod(validators);
        let selected = select_targets(&groups, limits.max_target_balance);
        build_batches(&groups, &selected, &limits)
    }

    fn limits(max_eth: u64, batch_size: usize, requested_sources: usize) -> BatchLimits {
        BatchLimits {
            max_target_balance: max_eth * GWEI_PER_ETH,
            batch_size,
            requested_sources,
        }
    }

    fn ids(validators: &[PlannedValidator]) -> Vec<u64> {
        validators.iter().map(|validator| validator.record.id).collect()
    }

    #[test]
    fn test_existing_target_absorbs_sources() {
        let batches = plan(
            vec![
                validator(1, POD_A, 32),
                validator(2, POD_A, 32),
                existing_target(3, POD_A, 1900),
                validator(4, POD_A, 32),
            ],
            limits(1984, 58, usize::MAX),
        );

        // 1984 - 1900 leaves room for two sources; the last one has no partner left.
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].target.record.id, 3);
        assert_eq!(ids(&batches[0].sources), vec![3, 1, 2]);
        assert_eq!(ids(batches[0].genuine_sources()), vec![1, 2]);
        assert_eq!(batches[0].post_consolidation_balance, 1964 * GWEI_PER_ETH);
        assert_eq!(batches[0].source_total(), 1964 * GWEI_PER_ETH);
    }

    #[test]
    fn test_leftover_sources_form_new_batches() {
        let mut validators = vec![existing_target(100, POD_A, 1900)];
        validators.extend((1..=5).map(|id| validator(id, POD_A, 32)));

        let batches = plan(validators, limits(1984, 58, usize::MAX));
        let layout = batches
            .iter()
            .map(|batch| ids(&batch.sources))
            .collect::<Vec<_>>();
        assert_eq!(layout, vec![vec![100, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn test_batch_size_caps_sources() {
        let validators = (1..=7).map(|id| validator(id, POD_A, 32)).collect();
        let batches = plan(validators, limits(1900, 3, usize::MAX));
        let layout = batches
            .iter()
            .map(|batch| ids(&batch.sources))
            .collect::<Vec<_>>();
        assert_eq!(layout, vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert!(batches.iter().all(|batch| batch.sources.len() <= 3));
    }

    #[test]
    fn test_requested_count_stops_planning() {
        let mut validators = (1..=4).map(|id| validator(id, POD_A, 32)).collect::<Vec<_>>();
        validators.extend((11..=14).map(|id| validator(id, POD_B, 32)));

        let batches = plan(validators, limits(1900, 58, 4));
        let planned = batches
            .iter()
            .map(|batch| batch.genuine_sources().len())
            .sum::<usize>();
        assert_eq!(planned, 4);
        assert_eq!(ids(&batches[0].sources), vec![1, 2, 3, 4]);
        assert_eq!(batches[1].pod, POD_B);
        assert_eq!(ids(&batches[1].sources), vec![11, 12]);
    }

    #[test]
    fn test_existing_targets_are_never_sources() {
        let batches = plan(
            vec![
                existing_target(1, POD_A, 1000),
                existing_target(2, POD_A, 500),
                validator(3, POD_A, 32),
            ],
            limits(1900, 58, usize::MAX),
        );
        assert_eq!(batches.len(), 1);
        assert_eq!(ids(&batches[0].sources), vec![2, 3]);
    }

    #[test]
    fn test_no_target_or_source_reused() {
        let mut validators = Vec::new();
        for id in 1..=40 {
            let pod = if id % 2 == 0 { POD_A } else { POD_B };
            validators.push(validator(id, pod, 32 + id % 3));
        }
        let batches = plan(validators, limits(200, 10, usize::MAX));

        let mut seen = HashSet::new();
        for batch in &batches {
            assert_eq!(batch.sources[0].pubkey_key, batch.target.pubkey_key);
            assert!(batch.post_consolidation_balance <= 200 * GWEI_PER_ETH);
            for source in &batch.sources {
                assert_eq!(source.pod, batch.pod);
                assert!(seen.insert(source.pubkey_key.clone()), "validator reused");
            }
        }
    }

    #[test]
    fn test_order_candidates() {
        let members = vec![
            validator(1, POD_A, 40),
            validator(2, POD_A, 32),
            existing_target(3, POD_A, 900),
            validator(4, POD_A, 33),
        ];
        let ordered = order_candidates(&members);
        assert_eq!(
            ordered.iter().map(|member| member.record.id).collect::<Vec<_>>(),
            vec![3, 2, 4, 1]
        );
    }

    #[test]
    fn test_lowest_balance_leads_batch_over_spread_pick() {
        let in_bucket = |id, pod, balance_eth, bucket_index| {
            let mut validator = validator(id, pod, balance_eth);
            validator.bucket_index = Some(bucket_index);
            validator
        };
        let groups = group_by_pod(vec![
            in_bucket(1, POD_A, 32, 0),
            in_bucket(2, POD_A, 32, 0),
            in_bucket(3, POD_B, 32, 0),
            in_bucket(4, POD_B, 33, 1),
            in_bucket(5, POD_B, 32, 0),
        ]);
        let limits = limits(1900, 58, usize::MAX);
        let selected = select_targets(&groups, limits.max_target_balance);

        // Bucket spreading picks the 33 ETH validator for pod B.
        assert_eq!(selected[1].validator.record.id, 4);

        // The batch itself is led by the lowest balance candidate.
        let batches = build_batches(&groups, &selected, &limits);
        assert_eq!(batches.len(), 2);
        assert_eq!(ids(&batches[0].sources), vec![1, 2]);
        assert_eq!(batches[1].target.record.id, 3);
        assert_eq!(ids(&batches[1].sources), vec![3, 5, 4]);
        assert_eq!(batches[1].bucket_index, Some(0));
    }
}
