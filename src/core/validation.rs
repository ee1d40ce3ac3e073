//! Request validation ahead of the transfer engine
//!
//! These checks run before anything touches storage. A request that fails
//! here never produces a transaction record.

use crate::types::money::fits_scale;
use crate::types::{Account, LedgerError};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::ValidateEmail;

/// Smallest transferable amount
pub const MIN_TRANSFER_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Whether `email` is a well-formed address
pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

/// A transfer as submitted by an authenticated sender
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferRequest {
    pub receiver_email: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(receiver_email: impl Into<String>, amount: Decimal) -> Self {
        Self {
            receiver_email: receiver_email.into(),
            amount,
        }
    }

    /// Check the request against the sender submitting it
    ///
    /// Receiver existence is not checked here; the engine resolves the
    /// receiver and reports `ReceiverNotFound` itself.
    pub fn validate(&self, sender: &Account) -> Result<(), LedgerError> {
        if self.amount < MIN_TRANSFER_AMOUNT || !fits_scale(self.amount) {
            return Err(LedgerError::invalid_amount(self.amount));
        }

        let receiver_email = self.receiver_email.trim();
        if !is_valid_email(receiver_email) {
            return Err(LedgerError::invalid_email(receiver_email));
        }

        if receiver_email.eq_ignore_ascii_case(sender.email.trim()) {
            return Err(LedgerError::SelfTransfer { account: sender.id });
        }

        Ok(())
    }
}
