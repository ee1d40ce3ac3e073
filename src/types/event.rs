//! Domain events emitted after a committed transfer

use super::account::AccountId;
use super::transaction::Transaction;
use rust_decimal::Decimal;
use serde::Serialize;

/// Which side of the transfer an event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Sender,
    Receiver,
}

/// A transfer committed; one event per involved party
///
/// Carries the party's post-commit balance so a delivery channel can push
/// it without reading the store again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionCompleted {
    pub transaction: Transaction,
    pub for_user: AccountId,
    pub role: PartyRole,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
}

impl TransactionCompleted {
    /// Private per-user channel this event is meant for
    pub fn channel(&self) -> String {
        format!("private-user.{}", self.for_user)
    }
}
