//! rufous-finance: categorization, the ledger store, the ingestion pipeline
//! and the natural-language query path (intent resolution and execution).

pub mod category_rules;
pub mod executor;
pub mod export;
pub mod intent;
pub mod ledger;
pub mod pipeline;
pub mod recategorize;
pub mod resolver;

pub use category_rules::{Categorizer, Explanation};
pub use executor::{ExecutorConfig, GroupTotal, PeriodTotal, QueryError, QueryExecutor, QueryResult, SeriesPoint};
pub use export::{ExportError, export_csv};
pub use intent::{IntentKind, QueryIntent};
pub use ledger::{
    AggregateRow, GroupBy, InsertOutcome, LedgerError, LedgerStats, LedgerStore, MemoryLedger, SortOrder,
    SqliteLedger, TransactionFilter,
};
pub use pipeline::{CSV_LAYOUT, IngestError, Ingestor, StatementInput, StatementSummary};
pub use recategorize::{RecategorizeScope, RecategorizeSummary, recategorize};
pub use resolver::{IntentResolver, MAX_COMPLETION_BYTES};
