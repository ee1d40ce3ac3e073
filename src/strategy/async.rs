//! Asynchronous batch processing strategy
//!
//! Reads the transfers file in batches and hands each batch to a
//! [`BatchProcessor`], which runs different senders concurrently.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (sender partitioning + blocking pool)
//!         └── Arc<TransferService>
//! ```
//!
//! Batches are processed one after another, so a sender's transfers keep
//! file order across batch boundaries. Across senders the interleaving is
//! not deterministic: a transfer funded only by an earlier incoming
//! transfer from another sender may succeed or fail depending on timing.

use crate::core::batch_processor::{BatchProcessor, ProcessingSummary};
use crate::core::service::TransferService;
use crate::io::async_reader::AsyncReader;
use crate::strategy::ProcessingStrategy;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of instructions per batch
    pub batch_size: usize,
    /// Maximum number of sender partitions processing concurrently
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig; zero values fall back to the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid concurrency, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        service: &Arc<TransferService>,
        input_path: &Path,
    ) -> Result<ProcessingSummary, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let processor =
                BatchProcessor::new(Arc::clone(service), self.config.max_concurrent_batches);

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut summary = ProcessingSummary::default();
            let mut batches = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                summary.rejected += batch.skipped;
                if batch.is_empty() {
                    break;
                }
                batches += 1;

                for outcome in processor.process_batch(batch.instructions).await {
                    summary.record(&outcome.result);
                }
            }

            tracing::info!(
                batches,
                completed = summary.completed,
                failed = summary.failed,
                rejected = summary.rejected,
                "async processing finished"
            );
            Ok(summary)
        })
    }
}
