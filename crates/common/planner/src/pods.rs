use std::collections::{HashMap, HashSet};

use alloy_primitives::Address;
use coalesce_consensus::{
    balance::{Gwei, resolve_balance},
    credentials::{parse_pod_address, pod_key},
    errors::{CredentialError, SweepError},
    sweep::{SweepPosition, SweepState, compute_sweep_position},
    validator::ValidatorRecord,
};
use serde::Serialize;
use tracing::warn;

use crate::errors::PlanError;

/// A validator record with everything planning needs resolved up front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedValidator {
    pub record: ValidatorRecord,
    /// Lowercase, `0x` prefixed pubkey used for identity comparisons.
    pub pubkey_key: String,
    pub balance: Gwei,
    pub pod: Address,
    pub sweep: Option<SweepPosition>,
    pub bucket_index: Option<usize>,
}

impl PlannedValidator {
    pub fn is_existing_target(&self) -> bool {
        self.record.is_existing_target
    }

    /// Already on 0x02 credentials, either flagged by the registry or by its credential prefix.
    pub fn is_compounding(&self) -> bool {
        self.record.is_existing_target || self.record.has_compounding_withdrawal_credential()
    }

    pub fn seconds_until_sweep(&self) -> Option<u64> {
        self.sweep.map(|sweep| sweep.seconds_until_sweep)
    }

    pub fn with_bucket_index(self, bucket_index: usize) -> Self {
        Self {
            bucket_index: Some(bucket_index),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum ExclusionReason {
    InvalidCredentials(String),
    MissingBeaconIndex,
    OutOfRangeIndex(String),
    DuplicatePubkey,
}

impl From<CredentialError> for ExclusionReason {
    fn from(err: CredentialError) -> Self {
        ExclusionReason::InvalidCredentials(err.to_string())
    }
}

impl From<SweepError> for ExclusionReason {
    fn from(err: SweepError) -> Self {
        ExclusionReason::OutOfRangeIndex(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedValidator {
    pub id: u64,
    pub pubkey: String,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Default)]
pub struct PreparedValidators {
    /// Usable validators in input order.
    pub validators: Vec<PlannedValidator>,
    pub excluded: Vec<ExcludedValidator>,
}

/// Resolves balances, pod addresses and (when a sweep state is given) sweep positions.
///
/// Records that cannot be placed are excluded and logged rather than failing the run. A
/// missing balance on an existing 0x02 target is the one fatal condition.
pub fn prepare_validators(
    records: Vec<ValidatorRecord>,
    sweep_state: Option<&SweepState>,
) -> Result<PreparedValidators, PlanError> {
    if let Some(sweep_state) = sweep_state {
        sweep_state.validate()?;
    }

    let mut prepared = PreparedValidators::default();
    let mut seen_pubkeys = HashSet::new();

    for record in records {
        let balance = resolve_balance(&record)?;
        let pubkey_key = record.normalized_pubkey();

        let placement = parse_pod_address(&record.withdrawal_credentials)
            .map_err(ExclusionReason::from)
            .and_then(|pod| match sweep_state {
                None => Ok((pod, None)),
                Some(sweep_state) => {
                    let beacon_index = record
                        .beacon_index
                        .ok_or(ExclusionReason::MissingBeaconIndex)?;
                    let sweep = compute_sweep_position(beacon_index, sweep_state)?;
                    Ok((pod, Some(sweep)))
                }
            })
            .and_then(|placement| {
                if seen_pubkeys.insert(pubkey_key.clone()) {
                    Ok(placement)
                } else {
                    Err(ExclusionReason::DuplicatePubkey)
                }
            });

        match placement {
            Ok((pod, sweep)) => prepared.validators.push(PlannedValidator {
                record,
                pubkey_key,
                balance,
                pod,
                sweep,
                bucket_index: None,
            }),
            Err(reason) => {
                warn!(
                    "Excluding validator {} ({}): {reason:?}",
                    record.id,
                    record.short_pubkey()
                );
                prepared.excluded.push(ExcludedValidator {
                    id: record.id,
                    pubkey: record.pubkey,
                    reason,
                });
            }
        }
    }

    Ok(prepared)
}

/// Validators sharing one pod address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenPodGroup {
    pub pod: Address,
    pub members: Vec<PlannedValidator>,
}

impl EigenPodGroup {
    /// Lowercase hex pod address without the `0x` prefix.
    pub fn pod_key(&self) -> String {
        pod_key(&self.pod)
    }

    /// Members that may be consolidated away, i.e. everything but existing 0x02 targets.
    pub fn sources(&self) -> impl Iterator<Item = &PlannedValidator> {
        self.members
            .iter()
            .filter(|member| !member.is_existing_target())
    }

    pub fn has_sources(&self) -> bool {
        self.sources().next().is_some()
    }

    pub fn existing_target_count(&self) -> usize {
        self.members
            .iter()
            .filter(|member| member.is_existing_target())
            .count()
    }
}

/// Pod groups in discovery order: a pod's position is that of its first member in the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodGroups {
    groups: Vec<EigenPodGroup>,
}

impl PodGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EigenPodGroup> {
        self.groups.iter()
    }

    pub fn get(&self, pod: &Address) -> Option<&EigenPodGroup> {
        self.groups.iter().find(|group| &group.pod == pod)
    }
}

pub fn group_by_pod(validators: Vec<PlannedValidator>) -> PodGroups {
    let mut positions: HashMap<Address, usize> = HashMap::new();
    let mut groups: Vec<EigenPodGroup> = Vec::new();

    for validator in validators {
        match positions.get(&validator.pod) {
            Some(&position) => groups[position].members.push(validator),
            None => {
                positions.insert(validator.pod, groups.len());
                groups.push(EigenPodGroup {
                    pod: validator.pod,
                    members: vec![validator],
                });
            }
        }
    }

    PodGroups { groups }
}
