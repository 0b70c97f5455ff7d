use std::collections::BTreeMap;

use alloy_primitives::Address;
use coalesce_consensus::{
    balance::{Gwei, consolidation_capacity},
    constants::MIN_ACTIVATION_BALANCE,
};
use tracing::debug;

use crate::pods::{PlannedValidator, PodGroups};

/// The validator picked to receive a pod's first batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedTarget {
    pub pod: Address,
    pub validator: PlannedValidator,
    pub capacity: u64,
    pub bucket_index: usize,
}

/// Ranking key for target candidates, lowest first: 0x02 validators, then the least used
/// bucket, then the lowest balance, then the pubkey.
pub fn target_rank(
    candidate: &PlannedValidator,
    bucket_usage: &BTreeMap<usize, usize>,
) -> (bool, usize, Gwei, String) {
    let usage = candidate
        .bucket_index
        .and_then(|bucket_index| bucket_usage.get(&bucket_index).copied())
        .unwrap_or(0);
    (
        !candidate.is_compounding(),
        usage,
        candidate.balance,
        candidate.pubkey_key.clone(),
    )
}

/// Picks at most one target per pod, spreading picks over the sweep buckets.
///
/// Pods are visited in discovery order and each pick raises the usage of its bucket, so
/// later pods lean toward buckets nobody has claimed yet.
pub fn select_targets(groups: &PodGroups, max_target_balance: Gwei) -> Vec<SelectedTarget> {
    let mut bucket_usage: BTreeMap<usize, usize> = BTreeMap::new();
    let mut selected = Vec::new();

    for group in groups.iter() {
        if !group.has_sources() {
            debug!(
                "Skipping pod 0x{}: no 0x01 validators to consolidate",
                group.pod_key()
            );
            continue;
        }

        let mut candidates = group.members.iter().collect::<Vec<_>>();
        candidates.sort_by_cached_key(|candidate| target_rank(candidate, &bucket_usage));

        let pick = candidates.into_iter().find_map(|candidate| {
            let capacity =
                consolidation_capacity(candidate.balance, max_target_balance, MIN_ACTIVATION_BALANCE);
            (capacity > 0).then_some((candidate, capacity))
        });

        let Some((validator, capacity)) = pick else {
            debug!(
                "Skipping pod 0x{}: no candidate has room under the balance ceiling",
                group.pod_key()
            );
            continue;
        };

        let bucket_index = validator.bucket_index.unwrap_or(0);
        *bucket_usage.entry(bucket_index).or_default() += 1;
        selected.push(SelectedTarget {
            pod: group.pod,
            validator: validator.clone(),
            capacity,
            bucket_index,
        });
    }

    selected
}
