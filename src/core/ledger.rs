//! Ledger: account store plus transaction log, grouped into atomic units
//!
//! An [`AtomicUnit`] is the all-or-nothing scope for a transfer:
//!
//! ```text
//! begin ─► lock_and_load* ─► save* / insert* ─► commit
//!                                   │
//!                                   └─ drop without commit = rollback
//! ```
//!
//! Nothing a unit stages is visible to other callers until `commit`. Row
//! locks are taken in strictly ascending account id order; a unit refuses to
//! lock out of order, which makes deadlock between units impossible.
//!
//! `commit` holds the write side of a ledger-wide gate while it appends
//! records and writes balances. Reads that span more than one row or both
//! stores go through [`Ledger::snapshot`], which holds the read side, so they
//! see a transfer either entirely or not at all.

use crate::core::account_store::MemoryAccountStore;
use crate::core::traits::{AccountStore, TransactionLog};
use crate::core::transaction_log::MemoryTransactionLog;
use crate::types::{Account, AccountId, LedgerError, Transaction};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Shared handle to the account store and transaction log
#[derive(Clone)]
pub struct Ledger {
    accounts: Arc<dyn AccountStore>,
    transactions: Arc<dyn TransactionLog>,
    lock_timeout: Duration,

    /// Commits take the write side, snapshots the read side
    gate: Arc<RwLock<()>>,
}

impl Ledger {
    /// Create a ledger over the given stores
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        transactions: Arc<dyn TransactionLog>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            transactions,
            lock_timeout,
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Create a ledger backed by empty in-memory stores
    pub fn in_memory(lock_timeout: Duration) -> Self {
        Self::new(
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryTransactionLog::new()),
            lock_timeout,
        )
    }

    /// Same stores, different lock wait bound
    pub fn with_lock_timeout(&self, lock_timeout: Duration) -> Self {
        Self {
            lock_timeout,
            ..self.clone()
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// The account store
    ///
    /// Single-row reads through it are always consistent; reads over several
    /// rows belong in [`Ledger::snapshot`].
    pub fn accounts(&self) -> &dyn AccountStore {
        self.accounts.as_ref()
    }

    /// The transaction log
    pub fn transactions(&self) -> &dyn TransactionLog {
        self.transactions.as_ref()
    }

    /// Run `read` while no unit is halfway through its commit
    ///
    /// # Arguments
    ///
    /// * `read` - Closure given the account store and the transaction log
    ///
    /// # Returns
    ///
    /// Whatever `read` returns, or a storage error if the gate is poisoned
    pub fn snapshot<R>(
        &self,
        read: impl FnOnce(&dyn AccountStore, &dyn TransactionLog) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let _gate = self
            .gate
            .read()
            .map_err(|_| LedgerError::storage("ledger commit gate poisoned"))?;
        read(self.accounts.as_ref(), self.transactions.as_ref())
    }

    /// Every account, as of one committed state
    pub fn all_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.snapshot(|accounts, _| accounts.all_accounts())
    }

    /// Append a record outside any atomic unit
    ///
    /// Used for audit entries that must survive regardless of what happens
    /// to the surrounding transfer.
    pub fn record(&self, transaction: Transaction) -> Result<(), LedgerError> {
        self.transactions.insert(transaction)
    }

    /// Open a new atomic unit
    pub fn begin(&self) -> AtomicUnit<'_> {
        AtomicUnit {
            ledger: self,
            loaded: BTreeMap::new(),
            staged_accounts: BTreeMap::new(),
            staged_transactions: Vec::new(),
            finished: false,
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("transactions", &self.transactions.len())
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

/// A group of writes that commit or roll back together
///
/// Holds the row locks of every account it loaded until it is committed or
/// dropped.
pub struct AtomicUnit<'a> {
    ledger: &'a Ledger,

    /// Accounts locked by this unit, as loaded
    loaded: BTreeMap<AccountId, Account>,

    /// Accounts saved by this unit, pending commit
    staged_accounts: BTreeMap<AccountId, Account>,

    /// Records inserted by this unit, pending commit
    staged_transactions: Vec<Transaction>,

    finished: bool,
}

impl AtomicUnit<'_> {
    /// Lock an account and return its current state
    ///
    /// Loading an account this unit already holds returns the staged copy
    /// without locking again. New locks must be requested in ascending id
    /// order.
    pub fn lock_and_load(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        if let Some(account) = self.staged_accounts.get(&id).or_else(|| self.loaded.get(&id)) {
            return Ok(account.clone());
        }

        if let Some((highest, _)) = self.loaded.last_key_value() {
            if id < *highest {
                return Err(LedgerError::storage(format!(
                    "lock order violation: account {} requested after {}",
                    id, highest
                )));
            }
        }

        let account = self
            .ledger
            .accounts
            .lock(id, self.ledger.lock_timeout)?;
        tracing::trace!(account = %id, "row lock acquired");
        self.loaded.insert(id, account.clone());
        Ok(account)
    }

    /// Stage an updated account; it must be locked by this unit
    pub fn save(&mut self, account: Account) -> Result<(), LedgerError> {
        if !self.loaded.contains_key(&account.id) {
            return Err(LedgerError::storage(format!(
                "account {} saved without being locked",
                account.id
            )));
        }
        if account.balance.is_sign_negative() {
            return Err(LedgerError::storage(format!(
                "account {} would have a negative balance",
                account.id
            )));
        }
        self.staged_accounts.insert(account.id, account);
        Ok(())
    }

    /// Stage a transaction record
    pub fn insert(&mut self, transaction: Transaction) -> Result<(), LedgerError> {
        self.staged_transactions.push(transaction);
        Ok(())
    }

    /// Apply every staged write and release the locks
    ///
    /// Records are appended first because that is the step that can hit a
    /// constraint. If writing balances then fails, the appended records are
    /// retracted before the locks are released. Both steps run under the
    /// write side of the commit gate, so snapshots never observe them apart.
    pub fn commit(mut self) -> Result<(), LedgerError> {
        let transactions = std::mem::take(&mut self.staged_transactions);
        let ids: Vec<_> = transactions.iter().map(|tx| tx.id).collect();
        let accounts: Vec<Account> = self.staged_accounts.values().cloned().collect();

        {
            let _gate = self
                .ledger
                .gate
                .write()
                .map_err(|_| LedgerError::storage("ledger commit gate poisoned"))?;

            self.ledger.transactions.insert_batch(transactions)?;
            if let Err(error) = self.ledger.accounts.write_locked(&accounts) {
                self.ledger.transactions.retract(&ids);
                return Err(error);
            }
        }

        self.finished = true;
        self.release();
        Ok(())
    }

    /// Discard every staged write and release the locks
    pub fn rollback(mut self) {
        self.release();
    }

    fn release(&mut self) {
        for id in self.loaded.keys().rev() {
            self.ledger.accounts.unlock(*id);
        }
        self.loaded.clear();
        self.staged_accounts.clear();
        self.staged_transactions.clear();
    }
}

impl Drop for AtomicUnit<'_> {
    fn drop(&mut self) {
        if !self.finished && !self.loaded.is_empty() {
            tracing::debug!(locks = self.loaded.len(), "rolling back uncommitted unit");
        }
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn ledger() -> Ledger {
        let ledger = Ledger::in_memory(Duration::from_millis(100));
        for (id, balance) in [(1u64, 100i64), (2, 50), (3, 0)] {
            ledger
                .accounts()
                .insert_account(Account::new(id, format!("User {}", id), format!("user_{}@email.com", id), Decimal::new(balance, 0)))
                .unwrap();
        }
        ledger
    }

    fn balance(ledger: &Ledger, id: u64) -> Decimal {
        ledger.accounts().find_by_id(AccountId(id)).unwrap().unwrap().balance
    }

    #[test]
    fn test_commit_applies_all_writes() {
        let ledger = ledger();
        let mut unit = ledger.begin();

        let mut a = unit.lock_and_load(AccountId(1)).unwrap();
        let mut b = unit.lock_and_load(AccountId(2)).unwrap();
        a.balance -= Decimal::new(10, 0);
        b.balance += Decimal::new(10, 0);
        unit.save(a).unwrap();
        unit.save(b).unwrap();
        unit.insert(Transaction::completed_transfer(AccountId(1), AccountId(2), Decimal::new(10, 0), Decimal::ZERO))
            .unwrap();
        unit.commit().unwrap();

        assert_eq!(balance(&ledger, 1), Decimal::new(90, 0));
        assert_eq!(balance(&ledger, 2), Decimal::new(60, 0));
        assert_eq!(ledger.transactions().len(), 1);
    }

    #[test]
    fn test_drop_rolls_back_and_releases_locks() {
        let ledger = ledger();
        {
            let mut unit = ledger.begin();
            let mut a = unit.lock_and_load(AccountId(1)).unwrap();
            a.balance = Decimal::ZERO;
            unit.save(a).unwrap();
            unit.insert(Transaction::failed_transfer(AccountId(1), AccountId(2), Decimal::ONE))
                .unwrap();
        }

        assert_eq!(balance(&ledger, 1), Decimal::new(100, 0));
        assert!(ledger.transactions().is_empty());

        // Lock was released on drop.
        let mut unit = ledger.begin();
        assert!(unit.lock_and_load(AccountId(1)).is_ok());
    }

    #[test]
    fn test_lock_order_violation_is_rejected() {
        let ledger = ledger();
        let mut unit = ledger.begin();

        unit.lock_and_load(AccountId(2)).unwrap();
        let result = unit.lock_and_load(AccountId(1));

        assert!(matches!(result, Err(LedgerError::Storage { .. })));
    }

    #[test]
    fn test_relock_returns_staged_copy() {
        let ledger = ledger();
        let mut unit = ledger.begin();

        let mut a = unit.lock_and_load(AccountId(1)).unwrap();
        a.balance = Decimal::new(1, 0);
        unit.save(a).unwrap();

        assert_eq!(unit.lock_and_load(AccountId(1)).unwrap().balance, Decimal::new(1, 0));
    }

    #[test]
    fn test_save_without_lock_is_rejected() {
        let ledger = ledger();
        let mut unit = ledger.begin();
        let account = ledger.accounts().find_by_id(AccountId(3)).unwrap().unwrap();

        assert!(unit.save(account).is_err());
    }

    #[test]
    fn test_snapshot_sees_whole_commits_only() {
        let ledger = ledger();

        std::thread::scope(|scope| {
            let writer = ledger.clone();
            scope.spawn(move || {
                for _ in 0..500 {
                    let mut unit = writer.begin();
                    let mut a = unit.lock_and_load(AccountId(1)).unwrap();
                    let mut c = unit.lock_and_load(AccountId(3)).unwrap();
                    a.balance -= Decimal::new(1, 1);
                    c.balance += Decimal::new(1, 1);
                    unit.save(a).unwrap();
                    unit.save(c).unwrap();
                    unit.insert(Transaction::completed_transfer(AccountId(1), AccountId(3), Decimal::new(1, 1), Decimal::ZERO))
                        .unwrap();
                    unit.commit().unwrap();
                }
            });

            for _ in 0..2000 {
                let (total, credited, records) = ledger
                    .snapshot(|accounts, transactions| {
                        let all = accounts.all_accounts()?;
                        let total: Decimal = all.iter().map(|a| a.balance).sum();
                        Ok((total, all[2].balance, transactions.len()))
                    })
                    .unwrap();
                assert_eq!(total, Decimal::new(150, 0));
                assert_eq!(credited, Decimal::new(records as i64, 1));
            }
        });

        assert_eq!(balance(&ledger, 3), Decimal::new(50, 0));
    }

    #[test]
    fn test_failed_commit_leaves_no_trace() {
        let ledger = ledger();
        let existing = Transaction::completed_transfer(AccountId(2), AccountId(3), Decimal::ONE, Decimal::ZERO);
        ledger.record(existing.clone()).unwrap();

        let mut unit = ledger.begin();
        let mut a = unit.lock_and_load(AccountId(1)).unwrap();
        a.balance = Decimal::ZERO;
        unit.save(a).unwrap();
        let mut clash = Transaction::completed_transfer(AccountId(1), AccountId(3), Decimal::ONE, Decimal::ZERO);
        clash.reference_id = existing.reference_id;
        unit.insert(clash).unwrap();

        let result = unit.commit();

        assert!(matches!(result, Err(LedgerError::DuplicateReference { .. })));
        assert_eq!(balance(&ledger, 1), Decimal::new(100, 0));
        assert_eq!(ledger.transactions().len(), 1);
    }
}
