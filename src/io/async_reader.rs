//! Asynchronous CSV reader for transfer instructions
//!
//! Reads transfer rows in batches through `csv-async`. Rows that fail to
//! parse or convert are logged, left out of the batch, and counted in
//! [`TransferBatch::skipped`].

use crate::io::csv_format::{convert_transfer_row, TransferInstruction, TransferRow};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// One batch of instructions plus the rows dropped while reading it
#[derive(Debug, Default)]
pub struct TransferBatch {
    pub instructions: Vec<TransferInstruction>,
    /// Rows that failed to parse or convert
    pub skipped: usize,
}

impl TransferBatch {
    /// No instructions left; the input is exhausted
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}

pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` valid instructions
    ///
    /// A batch without instructions means the input is exhausted; its
    /// `skipped` count may still be non-zero.
    pub async fn read_batch(&mut self, batch_size: usize) -> TransferBatch {
        let mut batch = TransferBatch {
            instructions: Vec::with_capacity(batch_size),
            skipped: 0,
        };
        let mut rows = self.csv_reader.deserialize::<TransferRow>();

        while batch.len() < batch_size {
            match rows.next().await {
                Some(Ok(row)) => match convert_transfer_row(row) {
                    Ok(instruction) => batch.instructions.push(instruction),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping transfer row");
                        batch.skipped += 1;
                    }
                },
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "CSV parse error");
                    batch.skipped += 1;
                }
                None => break,
            }
        }

        batch
    }
}
