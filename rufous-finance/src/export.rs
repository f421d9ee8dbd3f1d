//! Write the ledger out as CSV, oldest first.
//!
//! The first three columns are `date,description,amount` with signed
//! amounts, so an export of a checking ledger reads back through the CSV
//! import path unchanged.

use chrono::NaiveDate;
use rufous_core::Transaction;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use thiserror::Error;

use crate::ledger::{LedgerError, LedgerStore, TransactionFilter};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] LedgerError),
    #[error("writing csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("writing csv: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    date: NaiveDate,
    description: &'a str,
    amount: Decimal,
    posted_date: Option<NaiveDate>,
    direction: &'static str,
    category: &'a str,
    merchant: &'a str,
    location: Option<&'a str>,
    account_type: &'static str,
    statement_id: u64,
    is_transfer: bool,
    fingerprint: &'a str,
}

impl<'a> From<&'a Transaction> for ExportRow<'a> {
    fn from(t: &'a Transaction) -> Self {
        ExportRow {
            date: t.date,
            description: &t.description,
            amount: t.amount,
            posted_date: t.posted_date,
            direction: t.direction.as_str(),
            category: &t.category,
            merchant: &t.merchant,
            location: t.location.as_deref(),
            account_type: t.account_type.as_str(),
            statement_id: t.source_statement_id.0,
            is_transfer: t.is_transfer,
            fingerprint: t.fingerprint.as_str(),
        }
    }
}

/// Export transactions matching `filter`. Returns the number of rows written.
pub fn export_csv<W: io::Write>(
    store: &dyn LedgerStore,
    filter: &TransactionFilter,
    writer: W,
) -> Result<usize, ExportError> {
    let rows = store.query(filter)?;
    let mut wtr = csv::Writer::from_writer(writer);
    for t in &rows {
        wtr.serialize(ExportRow::from(t))?;
    }
    wtr.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::ledger::fixtures::{statement, txn};
    use rufous_core::AccountType;
    use rufous_ingest::parse_csv_export;

    fn ledger() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        let s = ledger.register_statement(statement()).unwrap().id;
        let mut uber = txn(s, (2024, 3, 6), "UBER TRIP", -1850, "Transportation");
        uber.location = Some("Toronto, Ontario, Canada".to_string());
        ledger.insert_if_absent(uber).unwrap();
        ledger.insert_if_absent(txn(s, (2024, 3, 5), "STARBUCKS, #1234", -575, "Food & Dining")).unwrap();
        ledger
    }

    #[test]
    fn test_export_writes_header_and_rows_in_date_order() {
        let mut out = Vec::new();
        let written = export_csv(&ledger(), &TransactionFilter::default(), &mut out).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "date,description,amount,posted_date,direction,category,merchant,location,\
                 account_type,statement_id,is_transfer,fingerprint"
            )
        );
        let first = lines.next().unwrap();
        assert!(first.starts_with("2024-03-05,\"STARBUCKS, #1234\",-5.75,,debit,Food & Dining,STARBUCKS,,debit,"));
        assert!(lines.next().unwrap().contains(",UBER TRIP,\"Toronto, Ontario, Canada\",debit,"));
    }

    #[test]
    fn test_export_reads_back_as_same_transactions() {
        let source = ledger();
        let mut out = Vec::new();
        export_csv(&source, &TransactionFilter::default(), &mut out).unwrap();

        let import = parse_csv_export(out.as_slice(), AccountType::Debit).unwrap();
        assert!(import.failures.is_empty());
        let stored = source.query(&TransactionFilter::default()).unwrap();
        let fingerprints: Vec<_> = import.transactions.iter().map(|p| p.fingerprint(AccountType::Debit)).collect();
        let expected: Vec<_> = stored.iter().map(|t| t.fingerprint.clone()).collect();
        assert_eq!(fingerprints, expected);
        assert_eq!(import.transactions[1].location.as_deref(), Some("Toronto, Ontario, Canada"));
    }
}
