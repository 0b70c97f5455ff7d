//! Linking legacy validator ids to their pubkeys through the operating timelock. A validator
//! must be linked before the node manager accepts consolidation requests naming it.

use std::collections::HashSet;

use alloy_primitives::{Address, B256, hex, keccak256};
use coalesce_consensus::validator::normalize_pubkey_key;
use coalesce_planner::output::ConsolidationData;
use tracing::info;

use crate::{
    calldata::{Pubkey, TimelockBatch, link_legacy_validators_calldata, normalize_pubkey},
    constants::{
        LINKING_SALT_TAG, MIN_DELAY_OPERATING_TIMELOCK, NODES_MANAGER, OPERATING_TIMELOCK,
    },
    errors::TransactionError,
    files::{SafeBatchFile, Transaction},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkingCandidates {
    pub ids: Vec<u64>,
    pub pubkeys: Vec<Pubkey>,
}

impl LinkingCandidates {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn push(
        &mut self,
        seen_ids: &mut HashSet<u64>,
        seen_pubkeys: &mut HashSet<String>,
        id: u64,
        pubkey: &str,
    ) -> Result<(), TransactionError> {
        if pubkey.is_empty() || seen_ids.contains(&id) {
            return Ok(());
        }
        let key = normalize_pubkey_key(pubkey);
        if seen_pubkeys.contains(&key) {
            return Ok(());
        }
        self.pubkeys.push(normalize_pubkey(pubkey)?);
        self.ids.push(id);
        seen_ids.insert(id);
        seen_pubkeys.insert(key);
        Ok(())
    }

    /// `linkLegacyValidatorIds` calldata for every candidate.
    pub fn calldata(&self) -> Vec<u8> {
        link_legacy_validators_calldata(&self.ids, &self.pubkeys)
    }

    pub fn salt(&self) -> B256 {
        linking_salt(&self.ids, &self.pubkeys)
    }
}

/// Validators that must be linked before the plan's transactions go through: each target and
/// the validator heading each `batch_size` chunk of its sources. The first occurrence of an id
/// or pubkey wins.
pub fn collect_linking_candidates(
    data: &ConsolidationData,
    batch_size: usize,
) -> Result<LinkingCandidates, TransactionError> {
    if batch_size == 0 {
        return Err(TransactionError::InvalidBatchSize);
    }

    let mut candidates = LinkingCandidates::default();
    let mut seen_ids = HashSet::new();
    let mut seen_pubkeys = HashSet::new();
    for entry in &data.consolidations {
        candidates.push(&mut seen_ids, &mut seen_pubkeys, entry.target.id, &entry.target.pubkey)?;

        let sources = entry
            .sources
            .iter()
            .filter(|source| !source.pubkey.is_empty())
            .collect::<Vec<_>>();
        for chunk in sources.chunks(batch_size) {
            if let Some(head) = chunk.first() {
                candidates.push(&mut seen_ids, &mut seen_pubkeys, head.id, &head.pubkey)?;
            }
        }
    }

    info!("{} validators need linking", candidates.len());
    Ok(candidates)
}

/// Deterministic timelock salt: keccak256 of a JSON document naming the ids, the bare hex
/// pubkeys and a fixed tag, rendered with `", "` and `": "` separators.
pub fn linking_salt(validator_ids: &[u64], pubkeys: &[Pubkey]) -> B256 {
    let ids = validator_ids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let pubkeys = pubkeys
        .iter()
        .map(|pubkey| format!("\"{}\"", hex::encode(pubkey)))
        .collect::<Vec<_>>()
        .join(", ");
    let document =
        format!("{{\"ids\": [{ids}], \"pubkeys\": [{pubkeys}], \"tag\": \"{LINKING_SALT_TAG}\"}}");
    keccak256(document.as_bytes())
}

/// Schedule and execute Safe batches for a timelocked link of `candidates`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkingTransactions {
    pub schedule: SafeBatchFile,
    pub execute: SafeBatchFile,
}

/// Builds both halves of the timelock operation, or nothing when no validator needs linking.
pub fn linking_transactions(
    candidates: &LinkingCandidates,
    chain_id: u64,
    safe_address: Address,
) -> Option<LinkingTransactions> {
    if candidates.is_empty() {
        return None;
    }

    let batch = TimelockBatch::single_call(NODES_MANAGER, candidates.calldata(), candidates.salt());
    let count = candidates.len();
    let schedule = SafeBatchFile::new(
        chain_id,
        safe_address,
        vec![Transaction::new(
            OPERATING_TIMELOCK,
            0,
            &batch.schedule_calldata(MIN_DELAY_OPERATING_TIMELOCK),
        )],
    )
    .with_meta(
        "Link Validators - Schedule",
        format!("Schedule linking of {count} validators via timelock"),
    );
    let execute = SafeBatchFile::new(
        chain_id,
        safe_address,
        vec![Transaction::new(OPERATING_TIMELOCK, 0, &batch.execute_calldata())],
    )
    .with_meta(
        "Link Validators - Execute",
        format!(
            "Execute linking of {count} validators (after {}h delay)",
            MIN_DELAY_OPERATING_TIMELOCK / 3600
        ),
    );

    Some(LinkingTransactions { schedule, execute })
}
