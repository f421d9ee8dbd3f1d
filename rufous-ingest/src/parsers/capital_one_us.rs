//! Capital One US card statements.
//!
//! Expected text rows after PDF-to-text:
//!   Trans Date     Post Date      Description                                         Amount
//!   Jul 20         Jul 22         H-E-B #455SAN MARCOSTX                                $5.82
//!   Jul 28         Jul 29         WALMART.COMWALMART.COMAR                            - $14.05
//!
//! Charges print positive; payments and refunds carry a leading minus.

use crate::layout::{AmountColumn, DateFormat, DirectionTable, StatementLayout};

pub const LAYOUT: StatementLayout = StatementLayout {
    name: "capital-one",
    date_prefix: r"^\s*(?P<date>[A-Za-z]{3}\s+\d{1,2})\s+(?P<posted>[A-Za-z]{3}\s+\d{1,2})\s+",
    date_formats: &[DateFormat { format: "%b %d", needs_year: true }],
    section_start: Some(r"Trans\s+Date\s+Post\s+Date\s+Description\s+Amount"),
    section_end: Some(r"(?i)^\s*total\s+transactions\s+for\s+this\s+period"),
    boilerplate: &[],
    description_noise: &[],
    amount_column: AmountColumn::Last,
    directions: DirectionTable::STANDARD,
    split_locations: true,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StatementParser;
    use chrono::NaiveDate;
    use rufous_core::{AccountType, Direction};
    use rust_decimal::Decimal;

    #[test]
    fn test_parses_basic_rows() {
        let text = r#"
Trans Date     Post Date      Description                                         Amount
Jul 20         Jul 22         H-E-B #455SAN MARCOSTX                                $5.82
Jul 28         Jul 29         WALMART.COMWALMART.COMAR                            - $14.05
Total Transactions for This Period                                                 $8.23
"#;

        let parser = StatementParser::new(&LAYOUT).unwrap();
        let out = parser.parse(&[text], AccountType::Credit, Some(2024));

        assert_eq!(out.transactions.len(), 2);
        let charge = &out.transactions[0];
        assert_eq!(charge.amount, Decimal::new(-582, 2));
        assert_eq!(charge.direction, Direction::Debit);
        assert_eq!(charge.posted_date, NaiveDate::from_ymd_opt(2024, 7, 22));
        assert!(charge.description.contains("H-E-B"));

        let refund = &out.transactions[1];
        assert_eq!(refund.amount, Decimal::new(1405, 2));
        assert_eq!(refund.direction, Direction::Credit);
    }
}
