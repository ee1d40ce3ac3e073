use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Apply wallet transfers with commission and print final balances
#[derive(Parser, Debug)]
#[command(name = "wallet-ledger")]
#[command(about = "Apply wallet transfers with commission and print final balances", long_about = None)]
pub struct CliArgs {
    /// Accounts CSV (id,name,email,balance)
    #[arg(value_name = "ACCOUNTS", help = "Path to the accounts CSV file")]
    pub accounts_file: PathBuf,

    /// Transfers CSV (sender,receiver,amount)
    #[arg(value_name = "TRANSFERS", help = "Path to the transfers CSV file")]
    pub transfers_file: PathBuf,

    /// YAML configuration file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Processing strategy to use for the transfers file
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' applies rows in file order, 'async' runs senders concurrently"
    )]
    pub strategy: StrategyType,

    /// Number of transfers per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfers per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent sender partitions (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of senders processed concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Print this user's history as JSON instead of the balances CSV
    #[arg(long = "history", value_name = "EMAIL")]
    pub history: Option<String>,

    /// History page to print (1-based)
    #[arg(long = "page", value_name = "PAGE", default_value_t = 1, requires = "history")]
    pub page: usize,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, defaulting what is unset
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}
