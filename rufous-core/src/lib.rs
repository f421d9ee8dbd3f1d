//! rufous-core: ledger data model, description normalization, fingerprints,
//! category reference data and date-range utilities.

pub mod category;
pub mod error;
pub mod fingerprint;
pub mod merchant;
pub mod time;
pub mod transaction;

pub use category::{Category, CategorySet, UNCATEGORIZED};
pub use error::{ExtractionInputError, ParseFailure, ParseFailureReason, RangeError, UnrecognizedIntent};
pub use fingerprint::Fingerprint;
pub use merchant::{compact_description, is_transfer, merchant_name, normalize_description};
pub use time::{DateRange, Granularity, find_relative_period, resolve_relative};
pub use transaction::{
    AccountType, Direction, NewStatement, NewTransaction, ParsedTransaction, Statement, StatementId,
    Transaction, TransactionId,
};
