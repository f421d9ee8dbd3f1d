//! Chase checking statements.
//!
//! Expected extracted-text section:
//!   TRANSACTION DETAIL
//!          DATE        DESCRIPTION                                     AMOUNT     BALANCE
//!          04/22       Discover     E-Payment 8148   Web ID: ...       -15.00      53.70
//!
//! Rows are `MM/DD`, so the statement year has to come from the caller.

use crate::layout::{AmountColumn, DateFormat, DirectionTable, StatementLayout};

pub const LAYOUT: StatementLayout = StatementLayout {
    name: "chase-debit",
    date_prefix: r"^\s*(?P<date>\d{2}/\d{2})\s+",
    date_formats: &[DateFormat { format: "%m/%d", needs_year: true }],
    section_start: Some(r"TRANSACTION\s+DETAIL"),
    section_end: Some(r"(?i)^\s*ending\s+balance"),
    boilerplate: &[r"(?i)^\s*total\s+(deposits|withdrawals|fees)\b"],
    description_noise: &[],
    amount_column: AmountColumn::BeforeBalance,
    directions: DirectionTable::STANDARD,
    split_locations: false,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StatementParser;
    use chrono::NaiveDate;
    use rufous_core::{AccountType, Direction};
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_chase_debit_basic() {
        let text = r#"
TRANSACTION DETAIL
       DATE        DESCRIPTION                                     AMOUNT     BALANCE
                   Beginning Balance                                           68.70
       04/22       Discover     E-Payment 8148   Web ID: 123       -15.00      53.70
       04/23       PAYROLL ACME INC                                100.00     153.70
                   Ending Balance                                             153.70
"#;

        let parser = StatementParser::new(&LAYOUT).unwrap();
        let out = parser.parse(&[text], AccountType::Debit, Some(2026));

        assert!(out.failures.is_empty(), "{:?}", out.failures);
        assert_eq!(out.transactions.len(), 2);
        let first = &out.transactions[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 4, 22).unwrap());
        assert_eq!(first.amount, Decimal::new(-1500, 2));
        assert_eq!(first.direction, Direction::Debit);
        assert_eq!(first.balance, Some(Decimal::new(5370, 2)));
        assert_eq!(first.description, "Discover E-Payment 8148 Web ID: 123");
        assert_eq!(out.transactions[1].amount, Decimal::new(10000, 2));
        assert_eq!(out.transactions[1].balance, Some(Decimal::new(15370, 2)));
    }

    #[test]
    fn test_rows_before_section_are_ignored() {
        let text = r#"
Account summary
04/01 SHOULD NOT PARSE 1.00 2.00
TRANSACTION DETAIL
04/22 COFFEE -4.50 10.00
"#;
        let parser = StatementParser::new(&LAYOUT).unwrap();
        let out = parser.parse(&[text], AccountType::Debit, Some(2026));
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.transactions[0].description, "COFFEE");
    }

    #[test]
    fn test_missing_year_is_a_failure() {
        let text = "TRANSACTION DETAIL\n04/22 COFFEE -4.50 10.00\n";
        let parser = StatementParser::new(&LAYOUT).unwrap();
        let out = parser.parse(&[text], AccountType::Debit, None);
        assert!(out.transactions.is_empty());
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].reason, rufous_core::ParseFailureReason::MissingYear);
    }
}
