//! Tabular exports (bank "download as CSV").
//!
//! Exports may open with a few blank or banner rows; everything before the
//! header row (first cell `Date`) is skipped. Columns are located by header
//! name, so `Date,Description,Amount` and wider exports both read:
//!
//!   Date,Description,Amount,Extended Details,Category
//!   02/16/2026,CLIPPER SYSTEMS,10.00,,Other-Government Services

use chrono::NaiveDate;
use rufous_core::{AccountType, ParseFailure, ParseFailureReason, ParsedTransaction};
use rust_decimal::Decimal;
use std::io;
use std::str::FromStr;

use crate::layout::DirectionTable;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

/// Rows read from one export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvImport {
    pub transactions: Vec<ParsedTransaction>,
    pub failures: Vec<ParseFailure>,
    pub zero_amount: usize,
}

struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    location: Option<usize>,
}

impl Columns {
    fn from_header(record: &csv::StringRecord) -> Option<Self> {
        let find = |name: &str| record.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        if !record.get(0)?.trim().eq_ignore_ascii_case("date") {
            return None;
        }
        Some(Columns {
            date: 0,
            description: find("description")?,
            amount: find("amount")?,
            location: find("location"),
        })
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS.iter().find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

/// `10`, `-5.75`, `$1,234.56`, `(45.00)`, `45.00-` → (magnitude, negative).
fn parse_cell_amount(s: &str) -> Option<(Decimal, bool)> {
    let mut s = s.trim();
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        s = inner;
        negative = true;
    }
    if let Some(rest) = s.strip_suffix('-') {
        s = rest;
        negative = true;
    }
    let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    let value = Decimal::from_str(&cleaned).ok()?;
    Some((value.abs(), negative || value.is_sign_negative()))
}

/// Read an export. Rows with a bad date or amount become failures; `page` on
/// a failure is always 1 and `line` is the 1-based CSV record number.
pub fn parse_csv_export<R: io::Read>(
    reader: R,
    account_type: AccountType,
) -> Result<CsvImport, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let rule = DirectionTable::STANDARD.rule(account_type);

    let mut out = CsvImport::default();
    let mut columns: Option<Columns> = None;

    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        let line = idx + 1;

        if columns.is_none() {
            columns = Columns::from_header(&record);
            continue;
        }
        let Some(cols) = &columns else { continue };

        let date_str = record.get(cols.date).unwrap_or("").trim();
        if date_str.is_empty() {
            continue;
        }

        let fail = |reason| ParseFailure {
            page: 1,
            line,
            text: record.iter().collect::<Vec<_>>().join(","),
            reason,
        };

        let Some(date) = parse_date(date_str) else {
            out.failures.push(fail(ParseFailureReason::UnrecognizedDate));
            continue;
        };

        let description = record
            .get(cols.description)
            .unwrap_or("")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if description.is_empty() {
            out.failures.push(fail(ParseFailureReason::EmptyDescription));
            continue;
        }

        let Some((magnitude, negative)) = parse_cell_amount(record.get(cols.amount).unwrap_or(""))
        else {
            out.failures.push(fail(ParseFailureReason::MissingAmount));
            continue;
        };

        let direction = rule.direction(negative, None);
        let Some(mut t) = ParsedTransaction::new(date, description, direction.signed(magnitude)) else {
            out.zero_amount += 1;
            continue;
        };
        t.location = cols
            .location
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        out.transactions.push(t);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rufous_core::Direction;

    const EXPORT: &str = "\
Account activity,,\n\
,,\n\
Date,Description,Amount,Category\n\
02/16/2026,CLIPPER SYSTEMS   MTC,10.00,Other-Government Services\n\
02/17/2026,WAKABA SAN FRANCISCO,37.3,Restaurant-Restaurant\n\
02/18/2026,AUTOPAY PAYMENT - THANK YOU,-500.00,\n\
02/19/2026,ADJUSTMENT,0.00,\n\
2026-02-30,BAD DATE,5.00,\n";

    #[test]
    fn test_parse_export_skips_banner_rows() {
        let out = parse_csv_export(EXPORT.as_bytes(), AccountType::Credit).unwrap();

        assert_eq!(out.transactions.len(), 3);
        assert_eq!(out.zero_amount, 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].reason, ParseFailureReason::UnrecognizedDate);

        let first = &out.transactions[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 2, 16).unwrap());
        assert_eq!(first.description, "CLIPPER SYSTEMS MTC");
        assert_eq!(first.amount, Decimal::new(-1000, 2));

        assert_eq!(out.transactions[1].amount, Decimal::new(-373, 1));
        assert_eq!(out.transactions[2].direction, Direction::Credit);
    }

    #[test]
    fn test_debit_export_uses_signed_amounts() {
        let data = "Date,Amount,Description\n2024-03-05,-5.75,STARBUCKS #1234\n";
        let out = parse_csv_export(data.as_bytes(), AccountType::Debit).unwrap();
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.transactions[0].amount, Decimal::new(-575, 2));
        assert_eq!(out.transactions[0].direction, Direction::Debit);
    }

    #[test]
    fn test_location_column_is_optional() {
        let data = "Date,Description,Amount,Location\n\
                    2024-10-12,TIM HORTONS #1234,-5.43,\"Toronto, Ontario, Canada\"\n\
                    2024-10-13,UBER TRIP,-18.50,\n";
        let out = parse_csv_export(data.as_bytes(), AccountType::Debit).unwrap();
        assert_eq!(out.transactions[0].location.as_deref(), Some("Toronto, Ontario, Canada"));
        assert_eq!(out.transactions[1].location, None);
    }

    #[test]
    fn test_cell_amount_shapes() {
        assert_eq!(parse_cell_amount("10"), Some((Decimal::new(10, 0), false)));
        assert_eq!(parse_cell_amount("$1,234.56"), Some((Decimal::new(123456, 2), false)));
        assert_eq!(parse_cell_amount("(45.00)"), Some((Decimal::new(4500, 2), true)));
        assert_eq!(parse_cell_amount("45.00-"), Some((Decimal::new(4500, 2), true)));
        assert_eq!(parse_cell_amount("n/a"), None);
    }

    #[test]
    fn test_no_header_yields_nothing() {
        let out = parse_csv_export("a,b,c\n1,2,3\n".as_bytes(), AccountType::Debit).unwrap();
        assert_eq!(out, CsvImport::default());
    }
}
