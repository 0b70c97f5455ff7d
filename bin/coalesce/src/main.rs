use std::{env, process};

use clap::Parser;
use coalesce::cli::{
    Cli, Commands, encode::run_encode, plan::run_plan, submarine::run_submarine,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let rust_log = env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let env_filter = match rust_log.is_empty() {
        true => EnvFilter::builder().parse_lossy(cli.verbosity.directive()),
        false => EnvFilter::builder().parse_lossy(rust_log),
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let result = match cli.command {
        Commands::Plan(config) => run_plan(&config).map(|plan| {
            info!(
                "Planned {} targets, {} sources, {:.2} ETH consolidated",
                plan.summary.total_targets,
                plan.summary.total_sources,
                plan.summary.total_eth_consolidated
            );
        }),
        Commands::Encode(config) => run_encode(&config).map(|_| ()),
        Commands::Submarine(config) => run_submarine(&config).map(|_| ()),
    };

    if let Err(err) = result {
        error!("{err:?}");
        process::exit(1);
    }
}
