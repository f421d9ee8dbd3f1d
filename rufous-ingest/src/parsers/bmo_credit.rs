//! BMO Mastercard statements.
//!
//! Rows carry a transaction date and a posting date; foreign purchases print
//! the conversion before the amount and push the merchant onto the next line:
//!
//!   Transactions since your last statement
//!   Oct. 12 Oct. 14 TIM HORTONS #1234 TORONTO ON                 5.43
//!   Oct. 13 Oct. 15 USD 20.68@1.412959381                        29.22
//!   CITIBIK*SUBSCRIPTION SAN FRANCISCOCA
//!   Oct. 20 Oct. 20 PAYMENT RECEIVED - THANK YOU               500.00 CR
//!   Subtotal for JANE DOE                                       34.65

use crate::layout::{AmountColumn, DateFormat, DirectionTable, StatementLayout};

pub const LAYOUT: StatementLayout = StatementLayout {
    name: "bmo-credit",
    date_prefix: r"^\s*(?P<date>[A-Za-z]{3}\.?\s+\d{1,2})\s+(?P<posted>[A-Za-z]{3}\.?\s+\d{1,2})\s+",
    date_formats: &[DateFormat { format: "%b %d", needs_year: true }],
    section_start: Some(r"Transactions since your last statement"),
    section_end: Some(r"Subtotal for"),
    boilerplate: &[r"(?i)^\s*card\s+number\b", r"(?i)^\s*total\s+for\s+card\b"],
    description_noise: &[r"\b[A-Z]{3}\s+[\d.]+@[\d.]+", r"(?i)\(continued on next page\)"],
    amount_column: AmountColumn::Last,
    directions: DirectionTable::STANDARD,
    split_locations: true,
};
