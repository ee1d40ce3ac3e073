//! Error types for the wallet ledger
//!
//! This module defines all error types that can occur while validating,
//! executing, or querying transfers.
//!
//! # Error Categories
//!
//! - **Validation Errors**: Malformed amount, malformed or own email
//! - **Lookup Errors**: Receiver, account, or transaction not found
//! - **Domain Errors**: Insufficient funds (always leaves a failed audit record)
//! - **Storage Errors**: Lock timeout, constraint violation, poisoned state
//!
//! Storage errors abort the whole atomic unit; nothing is partially applied.

use crate::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any persistence
    Validation,
    /// A looked-up entity does not exist
    NotFound,
    /// Sender cannot cover amount plus commission
    InsufficientFunds,
    /// The atomic unit could not commit
    Storage,
}

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is not strictly positive, below the minimum, or too precise
    #[error("Invalid transfer amount {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Receiver email is not a well-formed address
    #[error("Invalid receiver email '{email}'")]
    InvalidEmail {
        /// The rejected email
        email: String,
    },

    /// Sender tried to transfer to their own account
    #[error("Account {account} cannot transfer to itself")]
    SelfTransfer {
        /// The sender account
        account: AccountId,
    },

    /// No account matches the receiver email
    ///
    /// Nothing is recorded: the lookup precedes the audit record.
    #[error("Receiver '{email}' not found")]
    ReceiverNotFound {
        /// The email that was looked up
        email: String,
    },

    /// No account matches the sender email of a batch instruction
    #[error("Sender '{email}' not found")]
    SenderNotFound {
        /// The email that was looked up
        email: String,
    },

    /// The configured commission account does not exist
    #[error("Commission account '{email}' not found")]
    CommissionAccountNotFound {
        /// The configured email
        email: String,
    },

    /// An account referenced by id does not exist
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The missing account id
        account: AccountId,
    },

    /// A transaction is unknown or not visible to the requesting account
    #[error("Transaction {id} not found")]
    TransactionNotFound {
        /// The requested transaction id
        id: TransactionId,
    },

    /// Sender balance does not cover amount plus commission
    #[error("Insufficient funds for account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Sender account
        account: AccountId,
        /// Balance at the time of the check
        available: Decimal,
        /// Amount plus commission
        requested: Decimal,
    },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account being updated
        account: AccountId,
    },

    /// Row lock could not be acquired in time
    #[error("Timed out waiting for lock on account {account}")]
    LockTimeout {
        /// The contended account
        account: AccountId,
    },

    /// A transaction with the same reference id already exists
    #[error("Duplicate transaction reference {reference}")]
    DuplicateReference {
        /// The conflicting reference id
        reference: Uuid,
    },

    /// Account email already taken (seeding only)
    #[error("Duplicate account email '{email}'")]
    DuplicateEmail {
        /// The conflicting email
        email: String,
    },

    /// Any other storage failure
    #[error("Storage failure: {message}")]
    Storage {
        /// Description of the failure
        message: String,
    },
}

impl LedgerError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    /// Create an InvalidEmail error
    pub fn invalid_email(email: &str) -> Self {
        LedgerError::InvalidEmail {
            email: email.to_string(),
        }
    }

    /// Create a ReceiverNotFound error
    pub fn receiver_not_found(email: &str) -> Self {
        LedgerError::ReceiverNotFound {
            email: email.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account,
            available,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount { .. }
            | LedgerError::InvalidEmail { .. }
            | LedgerError::SelfTransfer { .. } => ErrorKind::Validation,
            LedgerError::ReceiverNotFound { .. }
            | LedgerError::SenderNotFound { .. }
            | LedgerError::TransactionNotFound { .. } => ErrorKind::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::CommissionAccountNotFound { .. }
            | LedgerError::AccountNotFound { .. }
            | LedgerError::ArithmeticOverflow { .. }
            | LedgerError::LockTimeout { .. }
            | LedgerError::DuplicateReference { .. }
            | LedgerError::DuplicateEmail { .. }
            | LedgerError::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// HTTP-equivalent status code for the caller
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::InsufficientFunds => 422,
            ErrorKind::NotFound => 404,
            ErrorKind::Storage => 500,
        }
    }

    /// Message safe to show to an end user
    ///
    /// Storage failures collapse into a generic message so internals never
    /// leak.
    pub fn user_message(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount { .. } => "The transfer amount must be a positive number.",
            LedgerError::InvalidEmail { .. } | LedgerError::ReceiverNotFound { .. } => {
                "The recipient with the specified email was not found."
            }
            LedgerError::SelfTransfer { .. } => "You cannot transfer money to your own account.",
            LedgerError::InsufficientFunds { .. } => {
                "You have insufficient funds to complete this transfer."
            }
            LedgerError::TransactionNotFound { .. } => "The requested transaction was not found.",
            _ => "An unexpected error occurred. Please contact support.",
        }
    }

    /// Whether the caller may retry the whole operation
    ///
    /// Only transient storage failures qualify: lock contention, a
    /// reference id collision, or a generic storage fault. Missing accounts,
    /// overflow and duplicate emails fail the same way every time. There is
    /// no deduplication by reference id, so retries must be deliberate.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::LockTimeout { .. }
                | LedgerError::DuplicateReference { .. }
                | LedgerError::Storage { .. }
        )
    }
}
