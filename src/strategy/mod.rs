//! Processing strategy module for transfer files
//!
//! A strategy reads a transfers CSV, pushes every instruction through a
//! [`TransferService`], and writes the final balances. Different
//! implementations (sequential, concurrent batches) are selected at
//! runtime.

use crate::cli::StrategyType;
use crate::config::WalletConfig;
use crate::core::batch_processor::ProcessingSummary;
use crate::core::ledger::Ledger;
use crate::core::notifier::EventPublisher;
use crate::core::service::TransferService;
use crate::io::csv_format::{next_account_id, read_accounts, write_accounts_csv};
use crate::types::Account;
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for transfer files
pub trait ProcessingStrategy: Send + Sync {
    /// Apply every transfer in `input_path`
    ///
    /// # Returns
    ///
    /// * `Ok(summary)` once every row was attempted
    /// * `Err(String)` if the file cannot be opened or read, or the runtime
    ///   cannot start
    ///
    /// A row that fails (bad format, unknown party, insufficient funds) is
    /// logged and counted; processing continues with the next row.
    fn process(
        &self,
        service: &Arc<TransferService>,
        input_path: &Path,
    ) -> Result<ProcessingSummary, String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` is only used by the async strategy.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}

/// Build a service over the accounts in `accounts_path`
///
/// If no account carries the configured commission email, a zero-balance
/// "Commission Account" is added with the next free id.
pub fn load_service(
    config: &WalletConfig,
    accounts_path: &Path,
    publisher: Arc<dyn EventPublisher>,
) -> Result<Arc<TransferService>, String> {
    let mut accounts = read_accounts(accounts_path)?;

    let has_commission = accounts.iter().any(|account| {
        account
            .email
            .trim()
            .eq_ignore_ascii_case(&config.commission_account_email)
    });
    if !has_commission {
        let id = next_account_id(&accounts);
        tracing::info!(account = %id, email = %config.commission_account_email, "creating commission account");
        accounts.push(Account::new(
            id,
            "Commission Account",
            config.commission_account_email.clone(),
            Decimal::ZERO,
        ));
    }

    let ledger = Ledger::in_memory(config.lock_timeout());
    for account in accounts {
        ledger
            .accounts()
            .insert_account(account)
            .map_err(|e| format!("Failed to load accounts: {}", e))?;
    }

    TransferService::new(ledger, config, publisher)
        .map(Arc::new)
        .map_err(|e| e.to_string())
}

/// Write every account's final balance as CSV
pub fn write_balances(service: &TransferService, output: &mut dyn Write) -> Result<(), String> {
    let accounts = service
        .ledger()
        .all_accounts()
        .map_err(|e| format!("Failed to read accounts: {}", e))?;
    write_accounts_csv(&accounts, output)
}
