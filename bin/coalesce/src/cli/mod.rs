pub mod constants;
pub mod encode;
pub mod output;
pub mod plan;
pub mod snapshot;
pub mod submarine;
pub mod verbosity;

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand};
use coalesce_transactions::constants::{DEFAULT_CHAIN_ID, NODES_MANAGER, OPERATING_ADMIN};

use crate::cli::{
    constants::DEFAULT_VERBOSITY,
    encode::EncodeConfig,
    plan::PlanConfig,
    submarine::SubmarineCommandConfig,
    verbosity::Verbosity,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        help = "Log level from 1 (errors only) to 5 (trace). RUST_LOG takes precedence when set",
        default_value = DEFAULT_VERBOSITY
    )]
    pub verbosity: Verbosity,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Plan consolidations for a validator snapshot and encode the Safe transactions
    #[command(name = "plan")]
    Plan(PlanConfig),

    /// Encode Safe transactions for an existing consolidation-data.json
    #[command(name = "encode")]
    Encode(EncodeConfig),

    /// Plan a withdrawal by consolidating pods past the effective balance cap
    #[command(name = "submarine")]
    Submarine(SubmarineCommandConfig),
}

/// Where and how the Safe transaction files are addressed.
#[derive(Debug, Clone, Args)]
pub struct SafeArgs {
    #[arg(long, env = "CHAIN_ID", help = "Chain ID written into every transaction file", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    #[arg(long, env = "SAFE_ADDRESS", help = "Gnosis Safe proposing the transactions", default_value_t = OPERATING_ADMIN)]
    pub safe_address: Address,

    #[arg(long, env = "NODES_MANAGER_ADDRESS", help = "Node manager receiving consolidation requests", default_value_t = NODES_MANAGER)]
    pub nodes_manager: Address,

    #[arg(long, help = "Skip the timelocked linking transactions")]
    pub skip_linking: bool,
}
