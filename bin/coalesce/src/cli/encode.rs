use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail};
use clap::Parser;
use coalesce_planner::{config::DEFAULT_FEE_PER_REQUEST_WEI, output::ConsolidationData};
use coalesce_transactions::{
    consolidation::consolidation_transactions,
    files::SafeBatchFile,
    linking::{collect_linking_candidates, linking_transactions},
    withdrawal::consolidation_file_name,
};
use tracing::info;

use crate::cli::{
    SafeArgs,
    constants::{DEFAULT_ENCODE_BATCH_SIZE, LINK_EXECUTE_FILE, LINK_SCHEDULE_FILE},
    output::write_json,
};

#[derive(Debug, Parser)]
pub struct EncodeConfig {
    #[arg(long, short, help = "Path to consolidation-data.json")]
    pub input: PathBuf,

    #[arg(long, short, help = "Output directory for transaction files (default: next to the input)")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Consolidation requests per transaction", default_value = DEFAULT_ENCODE_BATCH_SIZE)]
    pub batch_size: usize,

    #[arg(long, help = "Fee per consolidation request in wei", default_value_t = DEFAULT_FEE_PER_REQUEST_WEI)]
    pub fee: u64,

    #[command(flatten)]
    pub safe: SafeArgs,
}

/// Transaction files written for one set of consolidations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenTransactions {
    pub linking: Option<(PathBuf, PathBuf)>,
    pub consolidations: Vec<PathBuf>,
}

/// Writes the timelocked link (unless skipped) and one Safe batch per consolidation chunk.
pub fn write_safe_transactions(
    data: &ConsolidationData,
    safe: &SafeArgs,
    batch_size: usize,
    fee_per_request_wei: u64,
    output_dir: &Path,
) -> anyhow::Result<WrittenTransactions> {
    let mut written = WrittenTransactions::default();

    if safe.skip_linking {
        info!("Skipping linking transactions");
    } else {
        let candidates = collect_linking_candidates(data, batch_size)?;
        if let Some(linking) = linking_transactions(&candidates, safe.chain_id, safe.safe_address) {
            written.linking = Some((
                write_json(output_dir, LINK_SCHEDULE_FILE, &linking.schedule)?,
                write_json(output_dir, LINK_EXECUTE_FILE, &linking.execute)?,
            ));
        }
    }

    let transactions =
        consolidation_transactions(data, safe.nodes_manager, fee_per_request_wei, batch_size)?;
    for (position, transaction) in transactions.into_iter().enumerate() {
        let file = SafeBatchFile::new(safe.chain_id, safe.safe_address, vec![transaction.transaction]);
        written
            .consolidations
            .push(write_json(output_dir, &consolidation_file_name(position + 1), &file)?);
    }

    Ok(written)
}

pub fn load_consolidation_data(path: &Path) -> anyhow::Result<ConsolidationData> {
    let contents = read_to_string(path)
        .map_err(|err| anyhow!("Unable to read consolidation data {}: {err:?}", path.display()))?;
    serde_json::from_str(&contents)
        .map_err(|err| anyhow!("Invalid consolidation data {}: {err}", path.display()))
}

pub fn run_encode(config: &EncodeConfig) -> anyhow::Result<WrittenTransactions> {
    if config.batch_size == 0 {
        bail!("--batch-size must be positive");
    }

    let data = load_consolidation_data(&config.input)?;
    let output_dir = match &config.output_dir {
        Some(output_dir) => output_dir.clone(),
        None => config
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    let total_sources = data
        .consolidations
        .iter()
        .map(|entry| entry.sources.len())
        .sum::<usize>();
    info!(
        "Loaded {} consolidation targets with {total_sources} sources",
        data.consolidations.len()
    );
    if data.consolidations.is_empty() {
        info!("No consolidations to process");
        return Ok(WrittenTransactions::default());
    }

    let written = write_safe_transactions(&data, &config.safe, config.batch_size, config.fee, &output_dir)?;
    info!(
        "Wrote {} consolidation transactions to {}, {} wei in fees",
        written.consolidations.len(),
        output_dir.display(),
        u128::from(config.fee) * total_sources as u128
    );
    Ok(written)
}
