//! Read-only history queries
//!
//! Returns a user's balance and a page of the transactions they took part
//! in, newest first. Counterparty identities for a page are fetched with a
//! single batch lookup. No row locks are taken, so history reads never wait
//! on transfers in flight. Each read runs inside one ledger snapshot, so the
//! balance and the listed records always agree.

use crate::core::ledger::Ledger;
use crate::core::traits::AccountStore;
use crate::types::{AccountId, Counterparty, LedgerError, Transaction, TransactionId, TransactionView};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Length-aware page with 1-based page numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: usize,
    pub per_page: usize,
    pub total: usize,
    pub last_page: usize,
}

impl<T> Page<T> {
    /// Build a page; `last_page` is derived from `total` and is at least 1
    pub fn new(data: Vec<T>, current_page: usize, per_page: usize, total: usize) -> Self {
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };
        Self {
            data,
            current_page,
            per_page,
            total,
            last_page,
        }
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// Balance plus one page of history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
    /// Current balance as a 4dp decimal string
    pub balance: String,
    pub transactions: Page<TransactionView>,
}

/// Read side of the ledger: balances and paginated transaction history
#[derive(Debug, Clone)]
pub struct HistoryService {
    ledger: Ledger,
    page_size: usize,
}

impl HistoryService {
    /// Create a history service serving `page_size` records per page
    ///
    /// A `page_size` of 0 is raised to 1.
    pub fn new(ledger: Ledger, page_size: usize) -> Self {
        Self {
            ledger,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Balance and one page of history for an account
    ///
    /// # Arguments
    ///
    /// * `account_id` - The account whose history is read
    /// * `page` - 1-based page number; 0 is treated as 1
    ///
    /// # Returns
    ///
    /// * `Ok(History)` - Pages past the end have empty `data` and the real `total`
    /// * `Err(LedgerError::AccountNotFound)` - No such account
    pub fn get_history(&self, account_id: AccountId, page: usize) -> Result<History, LedgerError> {
        let page = page.max(1);
        let offset = (page - 1).saturating_mul(self.page_size);

        let (account, data, total) = self.ledger.snapshot(|accounts, transactions| {
            let account = accounts
                .find_by_id(account_id)?
                .ok_or(LedgerError::AccountNotFound { account: account_id })?;
            let (records, total) = transactions.for_participant(account_id, offset, self.page_size)?;
            let data = attach_parties(accounts, records)?;
            Ok((account, data, total))
        })?;
        tracing::debug!(account = %account_id, page, total, "history page served");

        Ok(History {
            balance: account.balance.to_string(),
            transactions: Page::new(data, page, self.page_size, total),
        })
    }

    /// One transaction, if `account_id` took part in it
    pub fn get_transaction(
        &self,
        account_id: AccountId,
        transaction_id: TransactionId,
    ) -> Result<TransactionView, LedgerError> {
        self.ledger.snapshot(|accounts, transactions| {
            let transaction = transactions
                .find(transaction_id)?
                .filter(|tx| tx.involves(account_id))
                .ok_or(LedgerError::TransactionNotFound { id: transaction_id })?;

            attach_parties(accounts, vec![transaction])?
                .pop()
                .ok_or(LedgerError::TransactionNotFound { id: transaction_id })
        })
    }
}

fn attach_parties(
    accounts: &dyn AccountStore,
    records: Vec<Transaction>,
) -> Result<Vec<TransactionView>, LedgerError> {
    let ids: Vec<AccountId> = records
        .iter()
        .flat_map(|tx| [tx.sender_id, tx.receiver_id])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let parties: HashMap<AccountId, Counterparty> = accounts
        .find_many(&ids)?
        .iter()
        .map(|account| (account.id, account.counterparty()))
        .collect();

    Ok(records
        .into_iter()
        .map(|transaction| TransactionView {
            sender: parties.get(&transaction.sender_id).cloned(),
            receiver: parties.get(&transaction.receiver_id).cloned(),
            transaction,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, TransactionStatus};
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn seeded() -> Ledger {
        let ledger = Ledger::in_memory(Duration::from_millis(100));
        for (id, name) in [(1u64, "Alice"), (2, "Bob"), (3, "Carol")] {
            ledger
                .accounts()
                .insert_account(Account::new(
                    id,
                    name,
                    format!("{}@email.com", name.to_lowercase()),
                    Decimal::new(1000, 0),
                ))
                .unwrap();
        }
        ledger
    }

    fn transfer(ledger: &Ledger, sender: u64, receiver: u64, amount: i64) -> Transaction {
        let tx = Transaction::completed_transfer(
            AccountId(sender),
            AccountId(receiver),
            Decimal::new(amount, 0),
            Decimal::ZERO,
        );
        ledger.record(tx.clone()).unwrap();
        tx
    }

    #[rstest]
    #[case(0, 15, 1)]
    #[case(15, 15, 1)]
    #[case(16, 15, 2)]
    #[case(45, 15, 3)]
    fn test_last_page(#[case] total: usize, #[case] per_page: usize, #[case] last: usize) {
        let page: Page<()> = Page::new(Vec::new(), 1, per_page, total);
        assert_eq!(page.last_page, last);
    }

    #[test]
    fn test_history_newest_first_with_parties() {
        let ledger = seeded();
        transfer(&ledger, 1, 2, 10);
        transfer(&ledger, 3, 1, 20);
        transfer(&ledger, 2, 3, 30);
        let latest = transfer(&ledger, 2, 1, 40);

        let history = HistoryService::new(ledger, 15).get_history(AccountId(1), 1).unwrap();

        assert_eq!(history.balance, "1000.0000");
        assert_eq!(history.transactions.total, 3);
        let amounts: Vec<_> = history
            .transactions
            .data
            .iter()
            .map(|view| view.transaction.amount)
            .collect();
        assert_eq!(amounts, vec![Decimal::new(40, 0), Decimal::new(20, 0), Decimal::new(10, 0)]);

        let first = &history.transactions.data[0];
        assert_eq!(first.transaction.id, latest.id);
        assert_eq!(first.sender.as_ref().unwrap().name, "Bob");
        assert_eq!(first.receiver.as_ref().unwrap().email, "alice@email.com");
    }

    #[test]
    fn test_history_pagination() {
        let ledger = seeded();
        for amount in 1..=5 {
            transfer(&ledger, 1, 2, amount);
        }
        let service = HistoryService::new(ledger, 2);

        let page = service.get_history(AccountId(2), 3).unwrap().transactions;
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].transaction.amount, Decimal::new(1, 0));
        assert_eq!((page.current_page, page.last_page, page.total), (3, 3, 5));
        assert!(!page.has_more());

        let beyond = service.get_history(AccountId(2), 9).unwrap().transactions;
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.total, 5);
    }

    #[test]
    fn test_history_includes_failed_attempts() {
        let ledger = seeded();
        ledger
            .record(Transaction::failed_transfer(AccountId(1), AccountId(2), Decimal::new(5000, 0)))
            .unwrap();

        let history = HistoryService::new(ledger, 15).get_history(AccountId(1), 1).unwrap();

        assert_eq!(history.transactions.data[0].transaction.status, TransactionStatus::Failed);
    }

    #[test]
    fn test_history_unknown_account() {
        let service = HistoryService::new(seeded(), 15);
        assert_eq!(
            service.get_history(AccountId(99), 1),
            Err(LedgerError::AccountNotFound { account: AccountId(99) })
        );
    }

    #[test]
    fn test_get_transaction_requires_participation() {
        let ledger = seeded();
        let tx = transfer(&ledger, 1, 2, 10);
        let service = HistoryService::new(ledger, 15);

        assert_eq!(service.get_transaction(AccountId(2), tx.id).unwrap().transaction, tx);
        assert_eq!(
            service.get_transaction(AccountId(3), tx.id),
            Err(LedgerError::TransactionNotFound { id: tx.id })
        );
    }

    #[test]
    fn test_history_serializes_flat_rows() {
        let ledger = seeded();
        transfer(&ledger, 1, 2, 10);

        let history = HistoryService::new(ledger, 15).get_history(AccountId(1), 1).unwrap();
        let json = serde_json::to_value(&history).unwrap();

        assert_eq!(json["balance"], "1000.0000");
        assert_eq!(json["transactions"]["per_page"], 15);
        let row = &json["transactions"]["data"][0];
        assert_eq!(row["status"], "completed");
        assert_eq!(row["type"], "transfer");
        assert_eq!(row["sender"]["name"], "Alice");
        assert!(row["sender"].get("balance").is_none());
    }
}
