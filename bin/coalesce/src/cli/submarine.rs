use std::path::PathBuf;

use alloy_primitives::Address;
use anyhow::bail;
use clap::Parser;
use coalesce_consensus::balance::gwei_to_eth;
use coalesce_planner::{
    config::DEFAULT_FEE_PER_REQUEST_WEI,
    submarine::{DEFAULT_SUBMARINE_BATCH_SIZE, SubmarineConfig, SubmarinePlan},
};
use coalesce_transactions::{
    constants::DEFAULT_CHAIN_ID,
    withdrawal::{
        LINK_VALIDATORS_FILE, QUEUE_WITHDRAWALS_FILE, SubmarineManifest, consolidation_file_name,
        queue_withdrawals_file, submarine_consolidation_files, submarine_link_file,
    },
};
use tracing::info;

use crate::cli::{
    constants::{CONSOLIDATION_DATA_FILE, DEFAULT_OUTPUT_DIR, SUBMARINE_PLAN_FILE},
    output::write_json,
    snapshot::Snapshot,
};

#[derive(Debug, Parser)]
pub struct SubmarineCommandConfig {
    #[arg(long, short, help = "Path to the validator snapshot JSON")]
    pub input: PathBuf,

    #[arg(long, short, help = "Output directory", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    #[arg(long, help = "ETH amount to withdraw")]
    pub amount: f64,

    #[arg(long, help = "Validators per consolidation transaction, target included", default_value_t = DEFAULT_SUBMARINE_BATCH_SIZE)]
    pub batch_size: usize,

    #[arg(long, help = "Fee per consolidation request in wei", default_value_t = DEFAULT_FEE_PER_REQUEST_WEI)]
    pub fee: u64,

    #[arg(long, env = "CHAIN_ID", help = "Chain ID written into every transaction file", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    #[arg(long, env = "ADMIN_ADDRESS", help = "Account that sends the transactions directly")]
    pub from: Address,

    #[arg(long, help = "Targets are already linked, do not write link-validators.json")]
    pub skip_linking: bool,

    #[arg(long, help = "Preview the plan without writing files")]
    pub dry_run: bool,
}

pub fn run_submarine(config: &SubmarineCommandConfig) -> anyhow::Result<SubmarinePlan> {
    let snapshot = Snapshot::load(&config.input)?;
    let submarine_config = SubmarineConfig {
        amount_eth: config.amount,
        batch_size: config.batch_size,
        fee_per_request_wei: config.fee,
    };
    let plan = SubmarinePlan::build(snapshot.validators, &submarine_config)?;
    if plan.withdrawals.is_empty() {
        bail!("No pod can reach the effective balance cap with its available sources");
    }

    for pod in plan.pod_summaries() {
        info!(
            "Pod {}: target id={} {:.2} ETH, {} sources, {:.2} ETH after consolidation, withdraws {:.2} ETH",
            pod.eigenpod,
            pod.target_id,
            pod.target_balance_eth,
            pod.num_sources,
            pod.post_consolidation_eth,
            pod.withdrawal_eth
        );
    }
    info!(
        "Withdrawing {:.2} of {:.2} ETH requested",
        gwei_to_eth(plan.total_withdrawal),
        gwei_to_eth(plan.requested_amount)
    );
    if config.dry_run {
        info!("Dry run, no files written");
        return Ok(plan);
    }

    let output_dir = &config.output_dir;
    write_json(output_dir, CONSOLIDATION_DATA_FILE, &plan.to_consolidation_data())?;

    let link_file = if config.skip_linking {
        None
    } else {
        submarine_link_file(&plan, config.chain_id, config.from)?
    };
    if let Some(link_file) = &link_file {
        write_json(output_dir, LINK_VALIDATORS_FILE, link_file)?;
    }

    let consolidation_files = submarine_consolidation_files(&plan, config.chain_id, config.from)?;
    for (position, file) in consolidation_files.iter().enumerate() {
        write_json(output_dir, &consolidation_file_name(position + 1), file)?;
    }

    write_json(
        output_dir,
        QUEUE_WITHDRAWALS_FILE,
        &queue_withdrawals_file(&plan, config.chain_id, config.from),
    )?;
    write_json(
        output_dir,
        SUBMARINE_PLAN_FILE,
        &SubmarineManifest::new(&plan, link_file.is_some(), consolidation_files.len()),
    )?;

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use std::{fs::read_to_string, path::Path};

    use coalesce_transactions::{constants::OPERATING_ADMIN, withdrawal::QueueWithdrawalFile};
    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;
    use crate::cli::snapshot::test_utils::{NODE_ADDRESS, write_snapshot};

    fn submarine_config(input: &Path, output_dir: &Path, amount: &str) -> SubmarineCommandConfig {
        SubmarineCommandConfig::parse_from([
            "submarine".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output_dir.display().to_string(),
            "--amount".to_string(),
            amount.to_string(),
            "--from".to_string(),
            OPERATING_ADMIN.to_string(),
        ])
    }

    #[test]
    fn test_run_submarine_writes_execution_files() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let input = write_snapshot(dir.path())?;
        let output_dir = dir.path().join("submarine");

        let plan = run_submarine(&submarine_config(&input, &output_dir, "100"))?;
        // The 2000 ETH target needs five 32 ETH sources to clear the cap by 100 ETH.
        assert_eq!(plan.total_sources(), 5);

        for file in [
            CONSOLIDATION_DATA_FILE,
            LINK_VALIDATORS_FILE,
            "consolidation-txns-1.json",
            SUBMARINE_PLAN_FILE,
        ] {
            assert!(output_dir.join(file).exists(), "{file} missing");
        }
        assert!(!output_dir.join("consolidation-txns-2.json").exists());

        let queue: QueueWithdrawalFile =
            serde_json::from_str(&read_to_string(output_dir.join(QUEUE_WITHDRAWALS_FILE))?)?;
        assert_eq!(queue.transactions.len(), 1);
        assert_eq!(queue.transactions[0].target_id, 500);
        assert_eq!(queue.transactions[0].node_address, Some(NODE_ADDRESS.parse::<Address>()?));

        let manifest: Value =
            serde_json::from_str(&read_to_string(output_dir.join(SUBMARINE_PLAN_FILE))?)?;
        assert_eq!(manifest["transactions"]["total"], 3);
        assert_eq!(manifest["pods"][0]["withdrawal_eth"], 112.0);
        Ok(())
    }

    #[test]
    fn test_dry_run_writes_nothing() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let input = write_snapshot(dir.path())?;
        let output_dir = dir.path().join("submarine");

        let mut config = submarine_config(&input, &output_dir, "100");
        config.dry_run = true;
        run_submarine(&config)?;
        assert!(!output_dir.exists());
        Ok(())
    }

    #[test]
    fn test_unreachable_amount_fails() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let input = write_snapshot(dir.path())?;

        // Neither pod holds enough to cross the cap, once the 2000 ETH target is removed.
        let mut snapshot = Snapshot::load(&input)?;
        snapshot.validators.retain(|validator| validator.id != 500);
        write_json(dir.path(), "small.json", &snapshot)?;

        let config = submarine_config(&dir.path().join("small.json"), dir.path(), "100");
        assert!(run_submarine(&config).is_err());
        Ok(())
    }
}
