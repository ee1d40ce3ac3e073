//! Transfer engine
//!
//! This module provides the `TransferEngine`, which moves funds between a
//! sender, a receiver, and the commission account as one atomic unit.
//!
//! The engine enforces:
//! - A single commission computed from the gross amount, at 4dp
//! - An audit record for every attempt that reaches the funds check
//! - Row locks taken in ascending account id order, so concurrent
//!   transfers sharing accounts (always at least the commission account)
//!   cannot deadlock
//! - An authoritative funds check under lock; the check against the
//!   caller's snapshot is only a fast path
//!
//! # Flow
//!
//! ```text
//! create_transfer
//!     ├── quote (commission, total debit)
//!     ├── resolve receiver ──────────────► ReceiverNotFound (no record)
//!     ├── snapshot check ──┐
//!     ├── settle (unit) ───┴─ short ─────► failed record + InsufficientFunds
//!     │     lock ▸ re-check ▸ debit/credit ▸ insert ▸ commit
//!     └── TransferOutcome { transaction, notifications }
//! ```

use crate::config::WalletConfig;
use crate::core::ledger::Ledger;
use crate::types::money::{commission_for, fits_scale, to_scale};
use crate::types::{
    Account, AccountId, LedgerError, PartyRole, Transaction, TransactionCompleted,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Result of a committed transfer
///
/// The notifications are not yet published; hand them to a
/// [`Dispatcher`](crate::core::notifier::Dispatcher).
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub transaction: Transaction,
    pub notifications: Vec<TransactionCompleted>,
}

/// Commission and total debit for a gross amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub amount: Decimal,
    pub commission: Decimal,
    pub total_debit: Decimal,
}

/// Transfer processing engine
///
/// Cheap to clone; clones share the same ledger.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    ledger: Ledger,
    commission_account: AccountId,
    commission_rate: Decimal,
}

impl TransferEngine {
    /// Create a TransferEngine
    ///
    /// Resolves the commission account once by its configured email.
    ///
    /// # Errors
    ///
    /// Returns `CommissionAccountNotFound` if no account has that email.
    pub fn new(ledger: Ledger, config: &WalletConfig) -> Result<Self, LedgerError> {
        let commission_account = ledger
            .accounts()
            .find_by_email(&config.commission_account_email)?
            .ok_or_else(|| LedgerError::CommissionAccountNotFound {
                email: config.commission_account_email.clone(),
            })?;

        Ok(Self::with_commission_account(
            ledger,
            commission_account.id,
            config.commission_rate,
        ))
    }

    /// Create a TransferEngine with an already resolved commission account
    pub fn with_commission_account(
        ledger: Ledger,
        commission_account: AccountId,
        commission_rate: Decimal,
    ) -> Self {
        Self {
            ledger,
            commission_account,
            commission_rate,
        }
    }

    /// The ledger this engine writes to
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Id of the account credited with every commission
    pub fn commission_account(&self) -> AccountId {
        self.commission_account
    }

    /// Commission rate as a fraction (`0.015` is 1.5%)
    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    /// Compute commission and total debit for `amount`
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if the amount is not positive or has more than four
    /// decimal places; `ArithmeticOverflow` if the totals overflow.
    pub fn quote(&self, sender: AccountId, amount: Decimal) -> Result<Quote, LedgerError> {
        if amount <= Decimal::ZERO || !fits_scale(amount) {
            return Err(LedgerError::invalid_amount(amount));
        }

        let amount = to_scale(amount);
        let commission = commission_for(amount, self.commission_rate)
            .ok_or_else(|| LedgerError::arithmetic_overflow("commission", sender))?;
        let total_debit = amount
            .checked_add(commission)
            .ok_or_else(|| LedgerError::arithmetic_overflow("total debit", sender))?;

        Ok(Quote {
            amount,
            commission,
            total_debit,
        })
    }

    /// Transfer `amount` from `sender` to the account owning `receiver_email`
    ///
    /// `sender` is the caller's already loaded view of the sending account.
    /// Its balance is only used for the fast-path funds check; the
    /// authoritative check runs against the locked row.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` / `SelfTransfer`: nothing recorded
    /// - `ReceiverNotFound`: nothing recorded
    /// - `InsufficientFunds`: a failed record was written, balances unchanged
    /// - storage errors: the unit was rolled back, nothing recorded
    pub fn create_transfer(
        &self,
        sender: &Account,
        receiver_email: &str,
        amount: Decimal,
    ) -> Result<TransferOutcome, LedgerError> {
        let quote = self.quote(sender.id, amount)?;

        let receiver = self
            .ledger
            .accounts()
            .find_by_email(receiver_email.trim())?
            .ok_or_else(|| LedgerError::receiver_not_found(receiver_email))?;

        if receiver.id == sender.id {
            return Err(LedgerError::SelfTransfer { account: sender.id });
        }

        if sender.balance < quote.total_debit {
            return Err(self.record_failure(sender.id, receiver.id, quote, sender.balance));
        }

        match self.settle(sender.id, receiver.id, quote) {
            Ok(outcome) => {
                tracing::info!(
                    transaction_id = %outcome.transaction.id,
                    sender = %sender.id,
                    receiver = %receiver.id,
                    amount = %quote.amount,
                    commission = %quote.commission,
                    "transfer completed"
                );
                Ok(outcome)
            }
            Err(LedgerError::InsufficientFunds { available, .. }) => {
                Err(self.record_failure(sender.id, receiver.id, quote, available))
            }
            Err(error) => {
                tracing::error!(
                    sender = %sender.id,
                    receiver = %receiver.id,
                    amount = %quote.amount,
                    %error,
                    "transfer aborted"
                );
                Err(error)
            }
        }
    }

    /// Write the failed audit record and build the error to report
    ///
    /// Runs outside any unit. If the record itself cannot be written, that
    /// storage error is reported instead.
    fn record_failure(
        &self,
        sender: AccountId,
        receiver: AccountId,
        quote: Quote,
        available: Decimal,
    ) -> LedgerError {
        let record = Transaction::failed_transfer(sender, receiver, quote.amount);
        let transaction_id = record.id;

        if let Err(error) = self.ledger.record(record) {
            tracing::error!(%sender, %error, "failed to write failed-transfer record");
            return error;
        }

        tracing::warn!(
            %transaction_id,
            %sender,
            %receiver,
            %available,
            requested = %quote.total_debit,
            "transfer rejected: insufficient funds"
        );
        LedgerError::insufficient_funds(sender, available, quote.total_debit)
    }

    /// The atomic part: lock, re-check, move funds, insert, commit
    fn settle(
        &self,
        sender: AccountId,
        receiver: AccountId,
        quote: Quote,
    ) -> Result<TransferOutcome, LedgerError> {
        let mut ids = vec![sender, receiver, self.commission_account];
        ids.sort_unstable();
        ids.dedup();

        let mut unit = self.ledger.begin();
        let mut rows: BTreeMap<AccountId, Account> = BTreeMap::new();
        for id in ids {
            let account = unit.lock_and_load(id)?;
            rows.insert(id, account);
        }

        let available = balance_of(&rows, sender)?;
        if available < quote.total_debit {
            unit.rollback();
            return Err(LedgerError::insufficient_funds(
                sender,
                available,
                quote.total_debit,
            ));
        }

        adjust(&mut rows, sender, quote.total_debit, Direction::Debit)?;
        adjust(&mut rows, receiver, quote.amount, Direction::Credit)?;
        adjust(&mut rows, self.commission_account, quote.commission, Direction::Credit)?;

        for account in rows.values() {
            unit.save(account.clone())?;
        }

        let transaction =
            Transaction::completed_transfer(sender, receiver, quote.amount, quote.commission);
        unit.insert(transaction.clone())?;
        unit.commit()?;

        let notifications = vec![
            TransactionCompleted {
                transaction: transaction.clone(),
                for_user: sender,
                role: PartyRole::Sender,
                balance: balance_of(&rows, sender)?,
            },
            TransactionCompleted {
                transaction: transaction.clone(),
                for_user: receiver,
                role: PartyRole::Receiver,
                balance: balance_of(&rows, receiver)?,
            },
        ];

        Ok(TransferOutcome {
            transaction,
            notifications,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Debit,
    Credit,
}

fn balance_of(rows: &BTreeMap<AccountId, Account>, id: AccountId) -> Result<Decimal, LedgerError> {
    rows.get(&id)
        .map(|account| account.balance)
        .ok_or(LedgerError::AccountNotFound { account: id })
}

fn adjust(
    rows: &mut BTreeMap<AccountId, Account>,
    id: AccountId,
    delta: Decimal,
    direction: Direction,
) -> Result<(), LedgerError> {
    let account = rows
        .get_mut(&id)
        .ok_or(LedgerError::AccountNotFound { account: id })?;

    let balance = match direction {
        Direction::Debit => account
            .balance
            .checked_sub(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow("debit", id))?,
        Direction::Credit => account
            .balance
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow("credit", id))?,
    };

    account.balance = to_scale(balance);
    Ok(())
}
