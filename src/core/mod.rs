//! Core business logic module
//!
//! This module contains the ledger and transfer components:
//! - `traits` - Storage abstractions for interchangeable backends
//! - `account_store` - Account table with per-row locks
//! - `transaction_log` - Append-only transaction records
//! - `ledger` - Both stores plus atomic units of work
//! - `engine` - Transfer execution with commission
//! - `notifier` - Event publishing after commit
//! - `validation` - Request checks ahead of the engine
//! - `history` - Balance and paginated history queries
//! - `service` - Command surface tying the above together
//! - `batch_processor` - Concurrent processing of transfer instructions

pub mod account_store;
pub mod batch_processor;
pub mod engine;
pub mod history;
pub mod ledger;
pub mod notifier;
pub mod service;
pub mod traits;
pub mod transaction_log;
pub mod validation;

pub use account_store::MemoryAccountStore;
pub use batch_processor::{BatchProcessor, ProcessingResult, ProcessingSummary};
pub use engine::{TransferEngine, TransferOutcome};
pub use history::{History, HistoryService, Page};
pub use ledger::{AtomicUnit, Ledger};
pub use notifier::{ChannelPublisher, DispatchReport, Dispatcher, EventPublisher, LogPublisher};
pub use service::TransferService;
pub use traits::{AccountStore, TransactionLog};
pub use transaction_log::MemoryTransactionLog;
pub use validation::TransferRequest;
