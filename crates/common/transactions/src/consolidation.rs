use alloy_primitives::Address;
use coalesce_planner::output::ConsolidationData;
use tracing::{info, warn};

use crate::{
    calldata::{Pubkey, normalize_pubkey, request_consolidation_calldata},
    errors::TransactionError,
    files::{BatchMetadata, Transaction},
};

/// One `requestConsolidation` call together with what it consolidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationTransaction {
    pub transaction: Transaction,
    pub target_pubkey: String,
    pub num_validators: usize,
}

impl ConsolidationTransaction {
    pub fn metadata(&self) -> BatchMetadata {
        BatchMetadata {
            target_pubkey: self.target_pubkey.clone(),
            num_validators: self.num_validators,
        }
    }
}

/// Encodes a call paying `fee_per_request_wei` for each source, the head included.
pub fn consolidation_transaction<S: AsRef<str>>(
    nodes_manager: Address,
    target_pubkey: &str,
    source_pubkeys: &[S],
    fee_per_request_wei: u64,
) -> Result<ConsolidationTransaction, TransactionError> {
    let target = normalize_pubkey(target_pubkey)?;
    let sources = source_pubkeys
        .iter()
        .map(|pubkey| normalize_pubkey(pubkey.as_ref()))
        .collect::<Result<Vec<Pubkey>, _>>()?;

    let calldata = request_consolidation_calldata(&sources, &target);
    let value = u128::from(fee_per_request_wei) * sources.len() as u128;
    Ok(ConsolidationTransaction {
        transaction: Transaction::new(nodes_manager, value, &calldata),
        target_pubkey: target_pubkey.to_string(),
        num_validators: sources.len(),
    })
}

/// Splits every consolidation's source list into chunks of `batch_size` and encodes one
/// transaction per chunk. Entries without a target or without sources are skipped.
pub fn consolidation_transactions(
    data: &ConsolidationData,
    nodes_manager: Address,
    fee_per_request_wei: u64,
    batch_size: usize,
) -> Result<Vec<ConsolidationTransaction>, TransactionError> {
    if batch_size == 0 {
        return Err(TransactionError::InvalidBatchSize);
    }

    let mut transactions = Vec::new();
    for entry in &data.consolidations {
        let target_pubkey = entry.target_pubkey();
        if target_pubkey.is_empty() {
            warn!("Skipping consolidation with missing target pubkey");
            continue;
        }
        let source_pubkeys = entry
            .sources
            .iter()
            .map(|source| source.pubkey.as_str())
            .filter(|pubkey| !pubkey.is_empty())
            .collect::<Vec<_>>();
        if source_pubkeys.is_empty() {
            warn!("Skipping consolidation into {target_pubkey} with no source pubkeys");
            continue;
        }

        for chunk in source_pubkeys.chunks(batch_size) {
            transactions.push(consolidation_transaction(
                nodes_manager,
                target_pubkey,
                chunk,
                fee_per_request_wei,
            )?);
        }
    }

    info!(
        "Encoded {} consolidation transactions for {} targets",
        transactions.len(),
        data.consolidations.len()
    );
    Ok(transactions)
}
