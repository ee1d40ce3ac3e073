//! Account-related types for the wallet ledger
//!
//! This module defines the Account structure, its identifier, and the
//! counterparty projection attached to transaction history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier
///
/// Lock ordering across concurrent transfers is defined by the natural
/// ordering of this type, so it must stay `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AccountId {
    fn from(value: u64) -> Self {
        AccountId(value)
    }
}

/// User account state
///
/// Holds the monetary balance of a single user. The balance is a
/// fixed-point decimal kept at four fractional digits and never goes
/// below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The account identifier
    pub id: AccountId,

    /// Display name of the account holder
    pub name: String,

    /// Unique lookup key for transfers
    pub email: String,

    /// Current balance with 4 decimal places precision
    ///
    /// Only the transfer engine mutates this value, and only while holding
    /// the account's row lock.
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
}

impl Account {
    /// Create a new account with the given opening balance
    ///
    /// The balance is rescaled to four fractional digits.
    pub fn new(
        id: impl Into<AccountId>,
        name: impl Into<String>,
        email: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Account {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            balance: crate::types::money::to_scale(balance),
        }
    }

    /// Identity-only view of this account
    pub fn counterparty(&self) -> Counterparty {
        Counterparty {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Identity of the other side of a transaction
///
/// Deliberately excludes the balance: history rows only ever show who was
/// involved, never how much they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: AccountId,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_rescales_balance() {
        let account = Account::new(1, "User A", "user_a@email.com", Decimal::new(15, 1));
        assert_eq!(account.balance.to_string(), "1.5000");
        assert_eq!(account.id, AccountId(1));
    }

    #[test]
    fn test_counterparty_hides_balance() {
        let account = Account::new(7, "User B", "user_b@email.com", Decimal::new(1000, 0));
        let party = account.counterparty();

        let json = serde_json::to_string(&party).unwrap();
        assert_eq!(json, r#"{"id":7,"name":"User B","email":"user_b@email.com"}"#);
    }

    #[test]
    fn test_account_ids_order_numerically() {
        let mut ids = vec![AccountId(10), AccountId(2), AccountId(7)];
        ids.sort();
        assert_eq!(ids, vec![AccountId(2), AccountId(7), AccountId(10)]);
    }
}
