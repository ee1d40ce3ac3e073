//! Transfer command surface
//!
//! `TransferService` is what callers talk to. A transfer goes through
//! request validation, then the engine, then event dispatch:
//!
//! ```text
//! TransferRequest ─► validate ─► TransferEngine ─► Dispatcher ─► Transaction
//!                       │              │
//!                       └─ rejected    └─ failed record / error
//! ```
//!
//! Events are dispatched only after the engine has committed, and a
//! publish failure never turns a committed transfer into an error.

use crate::config::WalletConfig;
use crate::core::engine::TransferEngine;
use crate::core::history::{History, HistoryService};
use crate::core::ledger::Ledger;
use crate::core::notifier::{Dispatcher, EventPublisher};
use crate::core::validation::TransferRequest;
use crate::types::{Account, AccountId, LedgerError, Transaction, TransactionId, TransactionView};
use std::sync::Arc;

/// Entry point for transfers and history
///
/// Validates requests, runs them through the [`TransferEngine`], and
/// publishes the resulting notifications after commit. Publish failures are
/// logged and never undo a committed transfer.
#[derive(Debug, Clone)]
pub struct TransferService {
    engine: TransferEngine,
    history: HistoryService,
    dispatcher: Dispatcher,
}

impl TransferService {
    /// Build the service over `ledger`
    ///
    /// # Errors
    ///
    /// `CommissionAccountNotFound` if the configured commission account is
    /// not in the ledger.
    pub fn new(
        ledger: Ledger,
        config: &WalletConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> Result<Self, LedgerError> {
        let engine = TransferEngine::new(ledger.clone(), config)?;
        let history = HistoryService::new(ledger, config.history_page_size);

        Ok(Self {
            engine,
            history,
            dispatcher: Dispatcher::new(publisher),
        })
    }

    /// The underlying transfer engine
    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &Ledger {
        self.engine.ledger()
    }

    /// Validate and execute a transfer on behalf of `sender`
    pub fn create_transfer(
        &self,
        sender: &Account,
        request: &TransferRequest,
    ) -> Result<Transaction, LedgerError> {
        if let Err(error) = request.validate(sender) {
            tracing::debug!(sender = %sender.id, %error, "transfer request rejected");
            return Err(error);
        }

        let outcome = self
            .engine
            .create_transfer(sender, &request.receiver_email, request.amount)?;

        let report = self.dispatcher.dispatch(&outcome.notifications);
        if report.failed > 0 {
            tracing::warn!(
                transaction_id = %outcome.transaction.id,
                failed = report.failed,
                "transfer committed but not every party was notified"
            );
        }

        Ok(outcome.transaction)
    }

    /// Resolve the sender by email, then transfer
    ///
    /// The sender is loaded fresh for each call, the way an authenticated
    /// request would carry the current user.
    pub fn transfer_from(
        &self,
        sender_email: &str,
        request: &TransferRequest,
    ) -> Result<Transaction, LedgerError> {
        let sender = self
            .ledger()
            .accounts()
            .find_by_email(sender_email.trim())?
            .ok_or_else(|| LedgerError::SenderNotFound {
                email: sender_email.trim().to_string(),
            })?;
        self.create_transfer(&sender, request)
    }

    /// Balance and one page of history for `account_id`
    ///
    /// # Arguments
    ///
    /// * `account_id` - The account whose history is read
    /// * `page` - 1-based page number
    ///
    /// # Returns
    ///
    /// The history page, or `AccountNotFound`
    pub fn history(&self, account_id: AccountId, page: usize) -> Result<History, LedgerError> {
        self.history.get_history(account_id, page)
    }

    /// One transaction `account_id` took part in
    pub fn transaction(
        &self,
        account_id: AccountId,
        transaction_id: TransactionId,
    ) -> Result<TransactionView, LedgerError> {
        self.history.get_transaction(account_id, transaction_id)
    }
}
