//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - Row shapes, conversion, accounts loading and balance output
//! - `sync_reader` - Synchronous transfer reader with iterator interface
//! - `async_reader` - Asynchronous transfer reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::{AsyncReader, TransferBatch};
pub use csv_format::{
    convert_account_row, convert_transfer_row, read_accounts, write_accounts_csv, AccountRow,
    TransferInstruction, TransferRow,
};
pub use sync_reader::SyncReader;
