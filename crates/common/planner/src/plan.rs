use std::collections::{BTreeMap, HashSet};

use coalesce_consensus::{
    balance::gwei_to_eth,
    sweep::{ScheduleSummary, SweepState, spread_across_queue},
    validator::ValidatorRecord,
};
use serde::{Deserialize, Serialize, Serializer};
use tracing::info;

use crate::{
    batcher::{BatchLimits, ConsolidationBatch, build_batches},
    config::PlannerConfig,
    errors::PlanError,
    pods::{ExcludedValidator, PlannedValidator, group_by_pod, prepare_validators},
    targets::select_targets,
    validation::{ValidationReport, validate_plan},
};

fn serialize_bucket_distribution<S: Serializer>(
    distribution: &BTreeMap<usize, usize>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(
        distribution
            .iter()
            .map(|(bucket_index, count)| (format!("bucket_{bucket_index}"), count)),
    )
}

fn deserialize_bucket_distribution<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<usize, usize>, D::Error> {
    let raw = BTreeMap::<String, usize>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, count)| {
            key.strip_prefix("bucket_")
                .and_then(|index| index.parse().ok())
                .map(|index| (index, count))
                .ok_or_else(|| serde::de::Error::custom(format!("invalid bucket key {key:?}")))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSummary {
    pub total_targets: usize,
    /// Every entry of every batch's `sources`, self-consolidation heads included.
    pub total_sources: usize,
    pub total_eth_consolidated: f64,
    pub existing_0x02_targets_used: usize,
    /// Batches per sweep bucket, keyed `bucket_<index>` in bucket order.
    #[serde(
        serialize_with = "serialize_bucket_distribution",
        deserialize_with = "deserialize_bucket_distribution"
    )]
    pub bucket_distribution: BTreeMap<usize, usize>,
    pub withdrawal_credential_groups: usize,
}

impl PlanSummary {
    pub fn from_batches(batches: &[ConsolidationBatch]) -> Self {
        let mut bucket_distribution = BTreeMap::new();
        for bucket_index in batches.iter().filter_map(|batch| batch.bucket_index) {
            *bucket_distribution.entry(bucket_index).or_default() += 1;
        }

        Self {
            total_targets: batches.len(),
            total_sources: batches.iter().map(|batch| batch.sources.len()).sum(),
            total_eth_consolidated: gwei_to_eth(
                batches.iter().map(ConsolidationBatch::source_total).sum(),
            ),
            existing_0x02_targets_used: batches
                .iter()
                .filter(|batch| batch.target.is_existing_target())
                .count(),
            bucket_distribution,
            withdrawal_credential_groups: batches
                .iter()
                .map(|batch| batch.pod)
                .collect::<HashSet<_>>()
                .len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationPlan {
    pub consolidations: Vec<ConsolidationBatch>,
    pub summary: PlanSummary,
    pub validation: ValidationReport,
    pub schedule: ScheduleSummary,
    pub excluded: Vec<ExcludedValidator>,
}

/// Runs the full planning pipeline over one validator snapshot.
#[derive(Debug, Clone)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Result<Self, PlanError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn plan(
        &self,
        records: Vec<ValidatorRecord>,
        sweep_state: &SweepState,
    ) -> Result<ConsolidationPlan, PlanError> {
        let max_target_balance = self.config.max_target_balance();
        info!(
            "Planning consolidation of {} validators: max target balance {} ETH, {}h buckets, batch size {}",
            records.len(),
            self.config.max_target_balance_eth,
            self.config.bucket_hours,
            self.config.batch_size
        );

        let prepared = prepare_validators(records, Some(sweep_state))?;
        info!(
            "Prepared {} validators ({} excluded) at sweep index {} of {}",
            prepared.validators.len(),
            prepared.excluded.len(),
            sweep_state.sweep_index,
            sweep_state.total_validators
        );

        let indexed = prepared.validators.into_iter().enumerate().collect::<Vec<_>>();
        let schedule = spread_across_queue(indexed, self.config.bucket_hours, |(_, validator)| {
            validator.seconds_until_sweep().unwrap_or_default()
        })?;
        let schedule_summary = schedule.summary();
        info!(
            "Spread validators over {} sweep buckets spanning {}",
            schedule_summary.total_buckets, schedule_summary.total_queue_duration
        );

        let mut bucketed: Vec<(usize, PlannedValidator)> = schedule
            .buckets
            .into_iter()
            .flat_map(|bucket| {
                let bucket_index = bucket.bucket_index;
                bucket
                    .members
                    .into_iter()
                    .map(move |(position, validator)| {
                        (position, validator.with_bucket_index(bucket_index))
                    })
            })
            .collect();
        bucketed.sort_by_key(|(position, _)| *position);

        let groups = group_by_pod(bucketed.into_iter().map(|(_, validator)| validator).collect());
        let available_sources = groups.iter().map(|group| group.sources().count()).sum::<usize>();
        info!(
            "Grouped validators into {} pods with {available_sources} available sources",
            groups.len()
        );

        let selected = select_targets(&groups, max_target_balance);
        info!(
            "Selected {} targets across {} buckets",
            selected.len(),
            schedule_summary.total_buckets
        );

        let requested_sources = self.config.source_count.unwrap_or(available_sources);
        let consolidations = build_batches(
            &groups,
            &selected,
            &BatchLimits {
                max_target_balance,
                batch_size: self.config.batch_size,
                requested_sources,
            },
        );
        let summary = PlanSummary::from_batches(&consolidations);
        info!(
            "Planned {} batches consolidating {:.2} ETH",
            summary.total_targets, summary.total_eth_consolidated
        );

        let validation = validate_plan(&consolidations, max_target_balance, requested_sources);
        info!(
            "Validation: credentials matched {}, under capacity {}, targets first {}, distribution score {}",
            validation.all_credentials_matched,
            validation.all_targets_under_capacity,
            validation.all_targets_are_first_source,
            validation.sweep_distribution_score
        );

        Ok(ConsolidationPlan {
            consolidations,
            summary,
            validation,
            schedule: schedule_summary,
            excluded: prepared.excluded,
        })
    }
}
