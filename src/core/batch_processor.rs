//! Concurrent batch processing of transfer instructions
//!
//! The `BatchProcessor` partitions a batch by sender so that one sender's
//! transfers apply in input order, while different senders run in
//! parallel. Transfers block on row locks, so each partition runs on
//! tokio's blocking pool; a semaphore caps how many run at once.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     ├── Arc<TransferService>  (shared, Send + Sync)
//!     └── Arc<Semaphore>        (max concurrent partitions)
//! ```
//!
//! Cross-sender ordering is not preserved. Two senders paying the same
//! receiver contend on that receiver's row lock, and every transfer
//! contends on the commission account, which the ledger's ordered locking
//! keeps deadlock-free.

use crate::core::service::TransferService;
use crate::io::csv_format::TransferInstruction;
use crate::types::{ErrorKind, LedgerError, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Outcome of one instruction
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub instruction: TransferInstruction,
    pub result: Result<Transaction, LedgerError>,
}

/// Tally of a processing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Transfers that moved funds
    pub completed: usize,
    /// Transfers recorded as failed (insufficient funds)
    pub failed: usize,
    /// Instructions refused without a record, or aborted by storage errors
    pub rejected: usize,
}

impl ProcessingSummary {
    pub fn record(&mut self, result: &Result<Transaction, LedgerError>) {
        match result {
            Ok(_) => self.completed += 1,
            Err(error) if error.kind() == ErrorKind::InsufficientFunds => self.failed += 1,
            Err(_) => self.rejected += 1,
        }
    }

    pub fn merge(&mut self, other: ProcessingSummary) {
        self.completed += other.completed;
        self.failed += other.failed;
        self.rejected += other.rejected;
    }

    pub fn total(&self) -> usize {
        self.completed + self.failed + self.rejected
    }
}

/// Submit one instruction, logging a per-row failure
pub fn process_instruction(service: &TransferService, instruction: TransferInstruction) -> ProcessingResult {
    let result = service.transfer_from(&instruction.sender_email, &instruction.request);
    if let Err(error) = &result {
        tracing::warn!(
            sender = %instruction.sender_email,
            receiver = %instruction.request.receiver_email,
            amount = %instruction.request.amount,
            status = error.status_code(),
            reason = error.user_message(),
            %error,
            "transfer not completed"
        );
    }
    ProcessingResult {
        instruction,
        result,
    }
}

/// Concurrent processor for batches of transfer instructions
///
/// Each sender's instructions run in order on the blocking pool; at most
/// `max_concurrent` senders are processed at once.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    service: Arc<TransferService>,
    permits: Arc<Semaphore>,
}

impl BatchProcessor {
    /// Create a new BatchProcessor
    ///
    /// # Arguments
    ///
    /// * `service` - Shared transfer service
    /// * `max_concurrent` - Sender partitions allowed to run at once (0 is raised to 1)
    pub fn new(service: Arc<TransferService>, max_concurrent: usize) -> Self {
        Self {
            service,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Group instructions by sender email (case-insensitive), keeping order
    pub fn partition_by_sender(
        &self,
        batch: Vec<TransferInstruction>,
    ) -> HashMap<String, Vec<TransferInstruction>> {
        let mut partitions: HashMap<String, Vec<TransferInstruction>> = HashMap::new();
        for instruction in batch {
            partitions
                .entry(instruction.sender_email.to_lowercase())
                .or_default()
                .push(instruction);
        }
        partitions
    }

    /// Process a batch, one blocking task per sender partition
    ///
    /// Results of one sender stay in input order; results of different
    /// senders may interleave in any order.
    pub async fn process_batch(&self, batch: Vec<TransferInstruction>) -> Vec<ProcessingResult> {
        let partitions = self.partition_by_sender(batch);
        let mut tasks = Vec::with_capacity(partitions.len());

        for (_sender, instructions) in partitions {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, "batch semaphore closed");
                    break;
                }
            };
            let service = Arc::clone(&self.service);

            tasks.push(tokio::task::spawn_blocking(move || {
                let results: Vec<ProcessingResult> = instructions
                    .into_iter()
                    .map(|instruction| process_instruction(&service, instruction))
                    .collect();
                drop(permit);
                results
            }));
        }

        let mut results = Vec::new();
        for outcome in futures::future::join_all(tasks).await {
            match outcome {
                Ok(partition) => results.extend(partition),
                Err(e) => tracing::error!(error = %e, "transfer worker panicked"),
            }
        }
        results
    }
}
