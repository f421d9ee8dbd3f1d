//! Built-in statement layouts and the CSV export reader.

pub mod bmo_credit;
pub mod capital_one_us;
pub mod chase_debit;
pub mod csv_export;
pub mod generic;
