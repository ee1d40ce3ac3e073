//! Wallet ledger CLI
//!
//! Loads accounts, applies a file of transfers with commission, and prints
//! the final balances to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy async --batch-size 500 accounts.csv transfers.csv
//! cargo run -- --config wallet.yaml --history user_a@email.com accounts.csv transfers.csv
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the configured level.
//!
//! # Exit Codes
//!
//! - 0: Success (individual transfers may still have failed; see the log)
//! - 1: Error (bad config, unreadable file, unknown history user, etc.)

use std::io::Write;
use std::process;
use std::sync::Arc;
use wallet_ledger::cli;
use wallet_ledger::config::WalletConfig;
use wallet_ledger::core::{LogPublisher, TransferService};
use wallet_ledger::logging;
use wallet_ledger::strategy;

fn main() {
    let args = cli::parse_args();

    let config = match WalletConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    logging::init_logging(&config);

    if let Err(e) = run(&args, &config) {
        tracing::error!(error = %e, "wallet-ledger failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs, config: &WalletConfig) -> Result<(), String> {
    let service = strategy::load_service(config, &args.accounts_file, Arc::new(LogPublisher))?;

    let batch_config = matches!(args.strategy, cli::StrategyType::Async).then(|| args.to_batch_config());
    let processing = strategy::create_strategy(args.strategy, batch_config);
    processing.process(&service, &args.transfers_file)?;

    let mut output = std::io::stdout().lock();
    match &args.history {
        Some(email) => print_history(&service, email, args.page, &mut output),
        None => strategy::write_balances(&service, &mut output),
    }
}

fn print_history(
    service: &TransferService,
    email: &str,
    page: usize,
    output: &mut dyn Write,
) -> Result<(), String> {
    let account = service
        .ledger()
        .accounts()
        .find_by_email(email)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("No account with email '{}'", email))?;

    let history = service.history(account.id, page).map_err(|e| {
        tracing::error!(error = %e, status = e.status_code(), "history lookup failed");
        e.user_message().to_string()
    })?;
    let json = serde_json::to_string_pretty(&history)
        .map_err(|e| format!("Failed to serialize history: {}", e))?;
    writeln!(output, "{}", json).map_err(|e| format!("Failed to write output: {}", e))
}
