//! Wallet Ledger Library
//! # Overview
//!
//! A wallet ledger that moves money between user accounts, takes a
//! percentage commission on every transfer, and keeps an immutable record
//! of every attempt, including failed ones.
//!
//! # Architecture
//!
//! - [`types`] - Accounts, transactions, events, money helpers, errors
//! - [`config`] - YAML + environment configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - Stores and atomic units with ordered row locks
//!   - [`core::engine`] - Transfer execution with commission
//!   - [`core::service`] - Validation, execution and event dispatch
//!   - [`core::history`] - Balance and paginated history
//! - [`io`] - CSV input and output
//! - [`strategy`] - Sequential and concurrent file processing
//! - [`cli`] - CLI arguments parsing
//!
//! # Transfer rules
//!
//! - Commission is `round4(amount * rate)`, charged to the sender on top of
//!   the amount and credited to the commission account
//! - The sender must hold `amount + commission`; otherwise a `failed` record
//!   is written and nothing moves
//! - Sender, receiver and commission balances change together or not at all

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use config::WalletConfig;
pub use self::core::{Ledger, TransferEngine, TransferRequest, TransferService};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, LedgerError, Transaction, TransactionId, TransactionStatus,
    TransactionType,
};
