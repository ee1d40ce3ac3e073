//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account and counterparty types
//! - `transaction`: Transaction records, status, and kind
//! - `event`: Domain events published after a committed transfer
//! - `money`: Fixed-point helpers for 4dp amounts
//! - `error`: Error types for the ledger

pub mod account;
pub mod error;
pub mod event;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountId, Counterparty};
pub use error::{ErrorKind, LedgerError};
pub use event::{PartyRole, TransactionCompleted};
pub use transaction::{
    Transaction, TransactionId, TransactionStatus, TransactionType, TransactionView,
};
