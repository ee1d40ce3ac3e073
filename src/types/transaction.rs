//! Transaction-related types for the wallet ledger
//!
//! This module defines the immutable transaction record written for every
//! transfer attempt, along with its status and kind.

use super::account::{AccountId, Counterparty};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction identifier (primary key)
pub type TransactionId = Uuid;

/// Outcome of a transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Funds moved and all balances were committed
    Completed,

    /// The attempt was rejected; kept as an audit entry only
    Failed,
}

/// Kind of ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// User-to-user transfer with commission
    Transfer,

    /// External credit to an account
    ///
    /// Part of the persisted shape; the transfer engine never emits it.
    Deposit,
}

/// Immutable transaction record
///
/// Created exactly once per transfer attempt that reaches the funds check
/// and never updated or deleted afterwards. A failed record always carries
/// a zero commission fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,

    /// Gross transferred amount (> 0, 4 decimal places)
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,

    /// Fee credited to the commission account (>= 0, 4 decimal places)
    #[serde(with = "rust_decimal::serde::str")]
    pub commission_fee: Decimal,

    pub status: TransactionStatus,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    /// Unique external correlation id, distinct from `id`
    pub reference_id: Uuid,

    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a completed transfer record
    pub fn completed_transfer(
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Decimal,
        commission_fee: Decimal,
    ) -> Self {
        Self::transfer(
            sender_id,
            receiver_id,
            amount,
            commission_fee,
            TransactionStatus::Completed,
        )
    }

    /// Build a failed transfer record (commission is always zero)
    pub fn failed_transfer(sender_id: AccountId, receiver_id: AccountId, amount: Decimal) -> Self {
        Self::transfer(
            sender_id,
            receiver_id,
            amount,
            Decimal::ZERO,
            TransactionStatus::Failed,
        )
    }

    fn transfer(
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Decimal,
        commission_fee: Decimal,
        status: TransactionStatus,
    ) -> Self {
        Transaction {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            amount: super::money::to_scale(amount),
            commission_fee: super::money::to_scale(commission_fee),
            status,
            kind: TransactionType::Transfer,
            reference_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    /// Whether `account` is the sender or the receiver
    pub fn involves(&self, account: AccountId) -> bool {
        self.sender_id == account || self.receiver_id == account
    }
}

/// A transaction with both parties' identities attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub sender: Option<Counterparty>,
    pub receiver: Option<Counterparty>,
}
