//! rufous-ingest: statement text → transaction drafts.
//!
//! Layout tables, the page tokenizer, the row parser, CSV exports and batch
//! deduplication. Nothing here touches storage.

pub mod amount;
pub mod dedup;
pub mod layout;
pub mod location;
pub mod parser;
pub mod parsers;
pub mod tokenizer;
pub mod types;

pub use dedup::{FingerprintedDraft, Partition, partition};
pub use layout::{DirectionRule, DirectionTable, StatementLayout, builtin_layouts, layout_by_name};
pub use location::split_location;
pub use parser::{StatementParse, StatementParser, TransactionParser};
pub use parsers::csv_export::{CsvImport, parse_csv_export};
pub use tokenizer::{Tokenizer, split_pages};
pub use types::{CandidateGroup, TokenizedStatement};
