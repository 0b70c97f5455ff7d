use std::collections::{BTreeSet, HashSet};

use coalesce_consensus::{
    balance::{Gwei, gwei_to_eth},
    credentials::extract_pod_address,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::batcher::ConsolidationBatch;

/// Result of re-checking a finished plan. Problems are reported, not raised; the caller
/// decides whether a non-empty `errors` list blocks execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub all_credentials_matched: bool,
    pub all_targets_under_capacity: bool,
    pub all_targets_are_first_source: bool,
    pub no_duplicate_pubkeys: bool,
    /// Distinct buckets per batch, capped at 1.0 and rounded to two decimals.
    pub sweep_distribution_score: f64,
    /// Fewer sources could be planned than were requested.
    pub capacity_exhausted: bool,
    pub requested_sources: usize,
    pub planned_sources: usize,
    pub errors: Vec<String>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self {
            all_credentials_matched: true,
            all_targets_under_capacity: true,
            all_targets_are_first_source: true,
            no_duplicate_pubkeys: true,
            sweep_distribution_score: 0.0,
            capacity_exhausted: false,
            requested_sources: 0,
            planned_sources: 0,
            errors: vec![],
        }
    }
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn abbreviate(pubkey: &str) -> &str {
    pubkey.get(..20).unwrap_or(pubkey)
}

pub fn validate_plan(
    batches: &[ConsolidationBatch],
    max_target_balance: Gwei,
    requested_sources: usize,
) -> ValidationReport {
    let mut report = ValidationReport {
        requested_sources,
        ..Default::default()
    };
    let mut seen_targets = HashSet::new();
    let mut seen_sources = HashSet::new();

    for batch in batches {
        let target_pubkey = batch.target.record.normalized_pubkey();
        let target_pod = extract_pod_address(&batch.target.record.withdrawal_credentials);

        if batch
            .sources
            .first()
            .is_none_or(|head| head.record.normalized_pubkey() != target_pubkey)
        {
            report.all_targets_are_first_source = false;
            report.errors.push(format!(
                "Target {}... is not the first source in its batch",
                abbreviate(&target_pubkey)
            ));
        }

        if batch.post_consolidation_balance > max_target_balance {
            report.all_targets_under_capacity = false;
            report.errors.push(format!(
                "Target {}... exceeds max balance: {:.2} ETH",
                abbreviate(&target_pubkey),
                gwei_to_eth(batch.post_consolidation_balance)
            ));
        }

        if !seen_targets.insert(target_pubkey.clone()) {
            report.no_duplicate_pubkeys = false;
            report.errors.push(format!(
                "Duplicate target pubkey: {}...",
                abbreviate(&target_pubkey)
            ));
        } else if seen_sources.contains(&target_pubkey) {
            report.no_duplicate_pubkeys = false;
            report.errors.push(format!(
                "Duplicate pubkey: {}...",
                abbreviate(&target_pubkey)
            ));
        }

        for (position, source) in batch.sources.iter().enumerate() {
            let source_pubkey = source.record.normalized_pubkey();
            let source_pod = extract_pod_address(&source.record.withdrawal_credentials);

            if source_pod.is_none() || source_pod != target_pod {
                report.all_credentials_matched = false;
                report.errors.push(format!(
                    "Source {}... WC mismatch with target",
                    abbreviate(&source_pubkey)
                ));
            }

            let is_head = position == 0 && source_pubkey == target_pubkey;
            if is_head {
                continue;
            }
            if seen_targets.contains(&source_pubkey) || !seen_sources.insert(source_pubkey.clone())
            {
                report.no_duplicate_pubkeys = false;
                report.errors.push(format!(
                    "Duplicate pubkey: {}...",
                    abbreviate(&source_pubkey)
                ));
            }
        }
    }

    report.planned_sources = batches
        .iter()
        .map(|batch| batch.genuine_sources().len())
        .sum();
    report.capacity_exhausted = report.planned_sources < requested_sources;

    if !batches.is_empty() {
        let unique_buckets = batches
            .iter()
            .map(|batch| batch.bucket_index)
            .collect::<BTreeSet<_>>()
            .len();
        let score = (unique_buckets as f64 / batches.len() as f64).min(1.0);
        report.sweep_distribution_score = (score * 100.0).round() / 100.0;
    }

    if report.capacity_exhausted {
        warn!(
            "Only {} of {} requested sources could be planned",
            report.planned_sources, requested_sources
        );
    }
    for error in &report.errors {
        warn!("Plan validation: {error}");
    }

    report
}
