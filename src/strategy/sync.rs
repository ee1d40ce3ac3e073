//! Synchronous processing strategy
//!
//! Streams the transfers file one row at a time through [`SyncReader`] and
//! submits each instruction in file order on the calling thread. Output is
//! deterministic for a given input.

use crate::core::batch_processor::{process_instruction, ProcessingSummary};
use crate::core::service::TransferService;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        service: &Arc<TransferService>,
        input_path: &Path,
    ) -> Result<ProcessingSummary, String> {
        let reader = SyncReader::new(input_path)?;
        let mut summary = ProcessingSummary::default();

        for row in reader {
            match row {
                Ok(instruction) => {
                    let outcome = process_instruction(service, instruction);
                    summary.record(&outcome.result);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping transfer row");
                    summary.rejected += 1;
                }
            }
        }

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            rejected = summary.rejected,
            "sync processing finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::core::notifier::LogPublisher;
    use crate::strategy::{load_service, write_balances};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn service() -> (Arc<TransferService>, NamedTempFile) {
        let accounts = create_temp_csv(
            "id,name,email,balance\n1,A,a@email.com,1000\n2,B,b@email.com,50\n3,Commission,commission@wallet.app,0\n",
        );
        let service = load_service(&WalletConfig::default(), accounts.path(), Arc::new(LogPublisher)).unwrap();
        (service, accounts)
    }

    #[test]
    fn test_sync_strategy_applies_in_file_order() {
        let (service, _accounts) = service();
        // B can only afford the second transfer after receiving the first.
        let transfers = create_temp_csv(
            "sender,receiver,amount\na@email.com,b@email.com,100\nb@email.com,a@email.com,120\n",
        );

        let summary = SyncProcessingStrategy.process(&service, transfers.path()).unwrap();
        assert_eq!(summary.completed, 2);

        let mut output = Vec::new();
        write_balances(&service, &mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,email,balance\n\
             1,a@email.com,1018.5000\n\
             2,b@email.com,28.2000\n\
             3,commission@wallet.app,3.3000\n"
        );
    }

    #[test]
    fn test_sync_strategy_continues_past_bad_rows() {
        let (service, _accounts) = service();
        let transfers = create_temp_csv(
            "sender,receiver,amount\n\
             a@email.com,b@email.com,abc\n\
             a@email.com,nobody@email.com,10\n\
             b@email.com,a@email.com,500\n\
             a@email.com,b@email.com,10\n",
        );

        let summary = SyncProcessingStrategy.process(&service, transfers.path()).unwrap();

        assert_eq!(
            summary,
            ProcessingSummary {
                completed: 1,
                failed: 1,
                rejected: 2
            }
        );
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let (service, _accounts) = service();
        let result = SyncProcessingStrategy.process(&service, Path::new("nonexistent.csv"));
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
