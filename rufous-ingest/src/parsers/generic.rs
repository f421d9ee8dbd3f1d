//! Generic layout: one row per transaction, full dates, signed amounts.
//!
//!   2024-03-05  STARBUCKS #1234                      -5.75
//!   03/06/2024  PAYROLL ACME INC                  1,250.00
//!   07 Mar 2024 RENT MARCH                        (1,400.00)

use crate::layout::{AmountColumn, DateFormat, DirectionTable, StatementLayout};

pub const LAYOUT: StatementLayout = StatementLayout {
    name: "generic",
    date_prefix: r"^\s*(?P<date>\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4}|\d{1,2}\s+[A-Za-z]{3}\s+\d{4})\s+",
    date_formats: &[
        DateFormat { format: "%Y-%m-%d", needs_year: false },
        DateFormat { format: "%m/%d/%Y", needs_year: false },
        DateFormat { format: "%d %b %Y", needs_year: false },
    ],
    section_start: None,
    section_end: None,
    boilerplate: &[],
    description_noise: &[],
    amount_column: AmountColumn::Last,
    directions: DirectionTable::STANDARD,
    split_locations: false,
};
