//! Append-only transaction log
//!
//! Stores every transfer attempt, completed or failed. Records are never
//! updated; the only removal path is `retract`, used when an atomic unit
//! fails after its batch was appended.

use crate::core::traits::TransactionLog;
use crate::types::{AccountId, LedgerError, Transaction, TransactionId};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct LogState {
    /// Records in append order
    records: Vec<Transaction>,

    /// Primary key to position in `records`
    by_id: HashMap<TransactionId, usize>,

    /// Unique constraint on `reference_id`
    references: HashSet<Uuid>,
}

impl LogState {
    fn check(&self, transaction: &Transaction, batch_refs: &HashSet<Uuid>) -> Result<(), LedgerError> {
        if self.by_id.contains_key(&transaction.id) {
            return Err(LedgerError::storage(format!(
                "duplicate transaction id {}",
                transaction.id
            )));
        }
        if self.references.contains(&transaction.reference_id)
            || batch_refs.contains(&transaction.reference_id)
        {
            return Err(LedgerError::DuplicateReference {
                reference: transaction.reference_id,
            });
        }
        Ok(())
    }

    fn append(&mut self, transaction: Transaction) {
        self.by_id.insert(transaction.id, self.records.len());
        self.references.insert(transaction.reference_id);
        self.records.push(transaction);
    }
}

/// In-memory transaction log
///
/// A single `RwLock` covers the records and both indexes so a batch insert
/// is checked and applied as one step. History reads take the read side and
/// run in parallel.
#[derive(Debug, Default)]
pub struct MemoryTransactionLog {
    state: RwLock<LogState>,
}

impl MemoryTransactionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LogState>, LedgerError> {
        self.state
            .read()
            .map_err(|_| LedgerError::storage("transaction log lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LogState>, LedgerError> {
        self.state
            .write()
            .map_err(|_| LedgerError::storage("transaction log lock poisoned"))
    }
}

impl TransactionLog for MemoryTransactionLog {
    fn insert(&self, transaction: Transaction) -> Result<(), LedgerError> {
        self.insert_batch(vec![transaction])
    }

    fn insert_batch(&self, transactions: Vec<Transaction>) -> Result<(), LedgerError> {
        let mut state = self.write()?;

        let mut batch_refs = HashSet::with_capacity(transactions.len());
        for transaction in &transactions {
            state.check(transaction, &batch_refs)?;
            batch_refs.insert(transaction.reference_id);
        }

        for transaction in transactions {
            state.append(transaction);
        }
        Ok(())
    }

    fn retract(&self, ids: &[TransactionId]) {
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        let doomed: HashSet<&TransactionId> = ids.iter().collect();
        let records = std::mem::take(&mut state.records);
        state.by_id.clear();
        state.references.clear();
        for record in records {
            if !doomed.contains(&record.id) {
                state.append(record);
            }
        }
    }

    fn find(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        let state = self.read()?;
        Ok(state
            .by_id
            .get(&id)
            .map(|index| state.records[*index].clone()))
    }

    fn for_participant(
        &self,
        account: AccountId,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Transaction>, usize), LedgerError> {
        let state = self.read()?;

        // Newest first by timestamp; later appends win ties.
        let mut matches: Vec<(usize, &Transaction)> = state
            .records
            .iter()
            .enumerate()
            .filter(|(_, tx)| tx.involves(account))
            .collect();
        matches.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));

        let total = matches.len();
        let window = matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, tx)| tx.clone())
            .collect();

        Ok((window, total))
    }

    fn len(&self) -> usize {
        // A panicked writer never leaves a half-applied batch behind.
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .records
            .len()
    }
}
