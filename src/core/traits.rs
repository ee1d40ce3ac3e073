//! Core traits for account storage and the transaction log
//!
//! These are the persistence contracts the transfer engine is written
//! against. The in-memory implementations live in `account_store` and
//! `transaction_log`; a database-backed store would implement the same
//! traits with row locks and a SQL transaction.

use crate::types::{Account, AccountId, LedgerError, Transaction, TransactionId};
use std::time::Duration;

/// Trait for account storage with exclusive row locks
///
/// Row locks are advisory with respect to readers: `find_*` never blocks
/// and returns the last committed state. Only `lock` callers exclude each
/// other.
pub trait AccountStore: Send + Sync {
    /// Add a new account (seeding only)
    fn insert_account(&self, account: Account) -> Result<(), LedgerError>;

    /// Look up an account by id
    fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Look up an account by email (case-insensitive)
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, LedgerError>;

    /// Look up several accounts at once; unknown ids are skipped
    fn find_many(&self, ids: &[AccountId]) -> Result<Vec<Account>, LedgerError>;

    /// Acquire the exclusive row lock on an account and load it
    ///
    /// Blocks until the lock is free or `timeout` elapses, in which case
    /// `LedgerError::LockTimeout` is returned.
    fn lock(&self, id: AccountId, timeout: Duration) -> Result<Account, LedgerError>;

    /// Write accounts whose row locks are held by the caller
    ///
    /// Either every account is written or none is.
    fn write_locked(&self, accounts: &[Account]) -> Result<(), LedgerError>;

    /// Release a row lock and wake any waiter
    fn unlock(&self, id: AccountId);

    /// Snapshot of every account
    fn all_accounts(&self) -> Result<Vec<Account>, LedgerError>;
}

/// Trait for the append-only transaction log
pub trait TransactionLog: Send + Sync {
    /// Append one record
    fn insert(&self, transaction: Transaction) -> Result<(), LedgerError>;

    /// Append several records; either all are appended or none is
    fn insert_batch(&self, transactions: Vec<Transaction>) -> Result<(), LedgerError>;

    /// Remove records appended by a batch whose unit failed to commit
    fn retract(&self, ids: &[TransactionId]);

    /// Get a record by id
    fn find(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError>;

    /// Records where `account` is sender or receiver, newest first
    ///
    /// Returns the requested window and the total number of matches.
    fn for_participant(
        &self,
        account: AccountId,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Transaction>, usize), LedgerError>;

    /// Number of records in the log
    fn len(&self) -> usize;

    /// Whether the log has no records
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
