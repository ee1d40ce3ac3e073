//! Synchronous CSV reader for transfer instructions
//!
//! Wraps `csv::Reader` in an iterator. Each item is one converted row or a
//! message naming the line that failed, so callers can log and keep going.

use crate::io::csv_format::{convert_transfer_row, TransferInstruction, TransferRow};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<TransferInstruction, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.reader.deserialize::<TransferRow>().next()?;
        self.line_num += 1;

        Some(match row {
            Ok(row) => convert_transfer_row(row).map_err(|e| format!("Line {}: {}", self.line_num, e)),
            Err(e) => Err(format!("Line {}: CSV parse error: {}", self.line_num, e)),
        })
    }
}
