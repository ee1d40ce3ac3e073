//! Thread-safe in-memory account store with row locks
//!
//! This module provides `MemoryAccountStore`, which keeps accounts in a
//! `DashMap` and emulates database row locks on top of it.
//!
//! # Design
//!
//! Each account lives in its own `RowCell`: a short-lived `Mutex` guards the
//! row data, and a `locked` flag plus `Condvar` model the long-lived
//! exclusive row lock held by an atomic unit. The `Mutex` is only ever held
//! for the duration of a read or write, so readers never wait on a transfer
//! in flight; they see the last committed balance.
//!
//! ```text
//! MemoryAccountStore
//!     ├── DashMap<AccountId, Arc<RowCell>>  (account rows)
//!     └── DashMap<String, AccountId>        (unique email index)
//! ```
//!
//! # Thread Safety
//!
//! Different accounts never contend with each other. Lock acquisition on
//! the same account is serialized by the `Condvar`, bounded by the caller's
//! timeout.

use crate::core::traits::AccountStore;
use crate::types::{Account, AccountId, LedgerError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct Row {
    account: Account,
    locked: bool,
}

#[derive(Debug)]
struct RowCell {
    state: Mutex<Row>,
    released: Condvar,
}

impl RowCell {
    fn new(account: Account) -> Self {
        Self {
            state: Mutex::new(Row {
                account,
                locked: false,
            }),
            released: Condvar::new(),
        }
    }

    fn read(&self) -> Result<MutexGuard<'_, Row>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::storage("account row mutex poisoned"))
    }
}

/// Thread-safe account store
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    /// Account rows by id
    rows: DashMap<AccountId, Arc<RowCell>>,

    /// Lowercased email to account id
    emails: DashMap<String, AccountId>,
}

impl MemoryAccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the cell out of the map so no shard lock is held while waiting
    fn cell(&self, id: AccountId) -> Result<Arc<RowCell>, LedgerError> {
        self.rows
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LedgerError::AccountNotFound { account: id })
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AccountStore for MemoryAccountStore {
    fn insert_account(&self, account: Account) -> Result<(), LedgerError> {
        // The email shard stays locked until the row is in place, so two
        // inserts with the same email cannot both pass the check.
        let email = match self.emails.entry(email_key(&account.email)) {
            Entry::Occupied(_) => {
                return Err(LedgerError::DuplicateEmail {
                    email: account.email,
                })
            }
            Entry::Vacant(email) => email,
        };

        match self.rows.entry(account.id) {
            Entry::Occupied(_) => Err(LedgerError::storage(format!(
                "account {} already exists",
                account.id
            ))),
            Entry::Vacant(row) => {
                email.insert(account.id);
                row.insert(Arc::new(RowCell::new(account)));
                Ok(())
            }
        }
    }

    fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        match self.rows.get(&id).map(|entry| Arc::clone(entry.value())) {
            Some(cell) => Ok(Some(cell.read()?.account.clone())),
            None => Ok(None),
        }
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, LedgerError> {
        let id = match self.emails.get(&email_key(email)) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        self.find_by_id(id)
    }

    fn find_many(&self, ids: &[AccountId]) -> Result<Vec<Account>, LedgerError> {
        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(account) = self.find_by_id(*id)? {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    fn lock(&self, id: AccountId, timeout: Duration) -> Result<Account, LedgerError> {
        let cell = self.cell(id)?;
        let guard = cell.read()?;

        let (mut row, _) = cell
            .released
            .wait_timeout_while(guard, timeout, |row| row.locked)
            .map_err(|_| LedgerError::storage("account row mutex poisoned"))?;

        // The wait can return on timeout with the row still held elsewhere.
        if row.locked {
            return Err(LedgerError::LockTimeout { account: id });
        }

        row.locked = true;
        Ok(row.account.clone())
    }

    fn write_locked(&self, accounts: &[Account]) -> Result<(), LedgerError> {
        let mut cells = Vec::with_capacity(accounts.len());
        for account in accounts {
            let cell = self.cell(account.id)?;
            if !cell.read()?.locked {
                return Err(LedgerError::storage(format!(
                    "account {} written without holding its lock",
                    account.id
                )));
            }
            cells.push(cell);
        }

        for (cell, account) in cells.iter().zip(accounts) {
            cell.read()?.account.balance = account.balance;
        }
        Ok(())
    }

    fn unlock(&self, id: AccountId) {
        let Ok(cell) = self.cell(id) else {
            return;
        };
        // Releasing must succeed even if another holder panicked.
        let mut row = cell
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        row.locked = false;
        drop(row);
        cell.released.notify_one();
    }

    fn all_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let cells: Vec<Arc<RowCell>> = self
            .rows
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts = Vec::with_capacity(cells.len());
        for cell in cells {
            accounts.push(cell.read()?.account.clone());
        }
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::thread;
    use std::time::Instant;

    fn store_with(accounts: &[(u64, &str, i64)]) -> MemoryAccountStore {
        let store = MemoryAccountStore::new();
        for (id, email, balance) in accounts {
            store
                .insert_account(Account::new(*id, format!("User {}", id), *email, Decimal::new(*balance, 0)))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_find_by_email_is_case_insensitive() {
        let store = store_with(&[(1, "user_a@email.com", 100)]);

        let found = store.find_by_email("USER_A@email.com").unwrap();
        assert_eq!(found.map(|a| a.id), Some(AccountId(1)));
        assert!(store.find_by_email("nobody@email.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = store_with(&[(1, "user_a@email.com", 100)]);

        let result = store.insert_account(Account::new(2, "Other", "User_A@email.com", Decimal::ZERO));
        assert!(matches!(result, Err(LedgerError::DuplicateEmail { .. })));
    }

    #[test]
    fn test_concurrent_inserts_with_same_email() {
        let store = MemoryAccountStore::new();

        let inserted = thread::scope(|scope| {
            let handles: Vec<_> = (1..=8u64)
                .map(|id| {
                    let store = &store;
                    scope.spawn(move || {
                        store.insert_account(Account::new(id, "Racer", "race@email.com", Decimal::ZERO))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|result| result.is_ok())
                .count()
        });

        assert_eq!(inserted, 1);
        assert_eq!(store.all_accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_id_keeps_email_free() {
        let store = store_with(&[(1, "user_a@email.com", 100)]);

        assert!(store
            .insert_account(Account::new(1, "Other", "other@email.com", Decimal::ZERO))
            .is_err());
        assert!(store.find_by_email("other@email.com").unwrap().is_none());
    }

    #[test]
    fn test_lock_missing_account() {
        let store = MemoryAccountStore::new();
        let result = store.lock(AccountId(42), Duration::from_millis(10));
        assert_eq!(result, Err(LedgerError::AccountNotFound { account: AccountId(42) }));
    }

    #[test]
    fn test_lock_times_out_while_held() {
        let store = store_with(&[(1, "user_a@email.com", 100)]);
        store.lock(AccountId(1), Duration::from_millis(10)).unwrap();

        let started = Instant::now();
        let result = store.lock(AccountId(1), Duration::from_millis(50));

        assert_eq!(result, Err(LedgerError::LockTimeout { account: AccountId(1) }));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_unlock_wakes_waiter() {
        let store = Arc::new(store_with(&[(1, "user_a@email.com", 100)]));
        store.lock(AccountId(1), Duration::from_millis(10)).unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.lock(AccountId(1), Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(20));
        store.unlock(AccountId(1));

        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn test_readers_do_not_block_on_row_lock() {
        let store = store_with(&[(1, "user_a@email.com", 100)]);
        store.lock(AccountId(1), Duration::from_millis(10)).unwrap();

        let account = store.find_by_id(AccountId(1)).unwrap().unwrap();
        assert_eq!(account.balance, Decimal::new(100, 0));
    }

    #[test]
    fn test_write_requires_lock() {
        let store = store_with(&[(1, "user_a@email.com", 100), (2, "user_b@email.com", 0)]);
        store.lock(AccountId(1), Duration::from_millis(10)).unwrap();

        let mut a = store.find_by_id(AccountId(1)).unwrap().unwrap();
        let mut b = store.find_by_id(AccountId(2)).unwrap().unwrap();
        a.balance = Decimal::new(50, 0);
        b.balance = Decimal::new(50, 0);

        // Account 2 is not locked, so nothing is written.
        assert!(store.write_locked(&[a.clone(), b]).is_err());
        assert_eq!(
            store.find_by_id(AccountId(1)).unwrap().unwrap().balance,
            Decimal::new(100, 0)
        );

        store.write_locked(&[a]).unwrap();
        assert_eq!(
            store.find_by_id(AccountId(1)).unwrap().unwrap().balance,
            Decimal::new(50, 0)
        );
    }

    #[test]
    fn test_all_accounts_sorted_by_id() {
        let store = store_with(&[(3, "c@email.com", 0), (1, "a@email.com", 0), (2, "b@email.com", 0)]);

        let ids: Vec<u64> = store.all_accounts().unwrap().iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
