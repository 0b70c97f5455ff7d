use std::path::PathBuf;

use clap::Parser;
use coalesce_planner::{
    config::PlannerConfig,
    output::{ConsolidationData, collect_target_records},
    plan::{ConsolidationPlan, Planner},
};
use tracing::{info, warn};

use crate::cli::{
    SafeArgs,
    constants::{CONSOLIDATION_DATA_FILE, DEFAULT_OUTPUT_DIR, TARGETS_FILE},
    encode::write_safe_transactions,
    output::write_json,
    snapshot::Snapshot,
};

#[derive(Debug, Parser)]
pub struct PlanConfig {
    #[arg(long, short, help = "Path to the validator snapshot JSON")]
    pub input: PathBuf,

    #[arg(long, short, help = "Output directory", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    #[arg(long, help = "YAML file with planner settings. Flags below override its values")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Width of a sweep bucket in hours")]
    pub bucket_hours: Option<u64>,

    #[arg(long, help = "Ceiling for a target's balance after consolidation, in ETH")]
    pub max_target_balance: Option<f64>,

    #[arg(long, help = "Validators per consolidation transaction, target included")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Number of sources to consolidate (default: all available)")]
    pub count: Option<usize>,

    #[arg(long, help = "Fee per consolidation request in wei")]
    pub fee: Option<u64>,

    #[arg(long, help = "Only write consolidation-data.json and targets.json")]
    pub skip_transactions: bool,

    #[command(flatten)]
    pub safe: SafeArgs,
}

impl PlanConfig {
    /// Settings from `--config` (or the defaults), with every given flag taking precedence.
    pub fn planner_config(&self) -> anyhow::Result<PlannerConfig> {
        let mut config = match &self.config {
            Some(path) => PlannerConfig::from_yaml_file(path)?,
            None => PlannerConfig::default(),
        };
        if let Some(bucket_hours) = self.bucket_hours {
            config.bucket_hours = bucket_hours;
        }
        if let Some(max_target_balance) = self.max_target_balance {
            config.max_target_balance_eth = max_target_balance;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(count) = self.count {
            config.source_count = Some(count);
        }
        if let Some(fee) = self.fee {
            config.fee_per_request_wei = fee;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn run_plan(config: &PlanConfig) -> anyhow::Result<ConsolidationPlan> {
    let planner_config = config.planner_config()?;
    let snapshot = Snapshot::load(&config.input)?;
    let sweep_state = snapshot.sweep_state()?;
    info!(
        "Loaded {} validators, sweep at {} of {}",
        snapshot.validators.len(),
        sweep_state.sweep_index,
        sweep_state.total_validators
    );

    let planner = Planner::new(planner_config)?;
    let plan = planner.plan(snapshot.validators, &sweep_state)?;
    for error in &plan.validation.errors {
        warn!("Plan validation: {error}");
    }

    let data = ConsolidationData::from_plan(&plan);
    write_json(&config.output_dir, CONSOLIDATION_DATA_FILE, &data)?;
    write_json(
        &config.output_dir,
        TARGETS_FILE,
        &collect_target_records(&plan.consolidations),
    )?;

    if config.skip_transactions {
        return Ok(plan);
    }
    let planner_config = planner.config();
    let written = write_safe_transactions(
        &data,
        &config.safe,
        planner_config.batch_size,
        planner_config.fee_per_request_wei,
        &config.output_dir,
    )?;
    info!(
        "Planned {} consolidations of {} sources into {} transaction files",
        plan.consolidations.len(),
        plan.summary.total_sources,
        written.consolidations.len()
    );

    Ok(plan)
}
