//! CSV format handling
//!
//! Three shapes cross the CSV boundary:
//!
//! | File      | Columns                     | Direction |
//! |-----------|-----------------------------|-----------|
//! | accounts  | `id,name,email,balance`     | in        |
//! | transfers | `sender,receiver,amount`    | in        |
//! | balances  | `id,email,balance`          | out       |
//!
//! Raw rows are deserialized with string amounts, then converted. A row that
//! fails conversion is reported as a `String` and skipped by the caller.

use crate::core::validation::TransferRequest;
use crate::types::{Account, AccountId};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Raw accounts-file row
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountRow {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub balance: String,
}

/// Raw transfers-file row; parties are given by email
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransferRow {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
}

/// A transfer to submit on behalf of `sender_email`
#[derive(Debug, Clone, PartialEq)]
pub struct TransferInstruction {
    pub sender_email: String,
    pub request: TransferRequest,
}

fn parse_amount(raw: &str, what: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("Invalid {} '{}'", what, raw))
}

pub fn convert_account_row(row: AccountRow) -> Result<Account, String> {
    let balance = parse_amount(&row.balance, "balance")?;
    if balance.is_sign_negative() {
        return Err(format!(
            "Account {} has a negative opening balance {}",
            row.id, balance
        ));
    }
    Ok(Account::new(row.id, row.name, row.email, balance))
}

pub fn convert_transfer_row(row: TransferRow) -> Result<TransferInstruction, String> {
    if row.sender.trim().is_empty() {
        return Err("Transfer is missing a sender".to_string());
    }
    let amount = parse_amount(&row.amount, "amount")
        .map_err(|e| format!("{} for transfer from {}", e, row.sender))?;

    Ok(TransferInstruction {
        sender_email: row.sender.trim().to_string(),
        request: TransferRequest::new(row.receiver.trim(), amount),
    })
}

/// Read every account from an accounts CSV
///
/// Unlike transfers, a malformed account row is fatal: the ledger would
/// otherwise start from a state nobody asked for.
pub fn read_accounts(path: &Path) -> Result<Vec<Account>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    reader
        .deserialize::<AccountRow>()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|e| format!("CSV parse error: {}", e))
                .and_then(convert_account_row)
                .map_err(|e| format!("{} line {}: {}", path.display(), index + 2, e))
        })
        .collect()
}

/// Write final balances as `id,email,balance`, sorted by id, 4dp
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["id", "email", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by_key(|account| account.id);

    for account in sorted {
        writer
            .write_record(&[
                account.id.to_string(),
                account.email.clone(),
                format!("{:.4}", account.balance),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Next free id after every id in `accounts`
pub fn next_account_id(accounts: &[Account]) -> AccountId {
    AccountId(accounts.iter().map(|a| a.id.0).max().unwrap_or(0) + 1)
}
