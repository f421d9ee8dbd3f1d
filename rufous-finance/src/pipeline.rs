//! Write path: statement pages → drafts → dedup → categories → ledger.
//!
//! Each batch is parsed, deduplicated and categorized fully in memory and
//! only then committed as a sequence of `insert_if_absent` calls.

use chrono::{Datelike, NaiveDateTime};
use rufous_core::{
    AccountType, CategorySet, NewStatement, NewTransaction, ParseFailure, ParsedTransaction,
    StatementId,
};
use rufous_ingest::{StatementParser, builtin_layouts, parse_csv_export, partition};
use serde::{Deserialize, Serialize};
use std::io;
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::category_rules::Categorizer;
use crate::ledger::{InsertOutcome, LedgerError, LedgerStore};

/// Layout name recorded for statements read from CSV exports.
pub const CSV_LAYOUT: &str = "csv";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}: no pages with extractable text")]
    EmptyStatement(String),
    #[error("unknown statement layout {0:?}")]
    UnknownLayout(String),
    #[error("reading CSV export: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] LedgerError),
    #[error("{0}: ingest worker panicked")]
    WorkerPanicked(String),
}

/// One uploaded statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementInput {
    pub source_name: String,
    pub account_type: AccountType,
    pub layout: String,
    /// Extracted text, one entry per page.
    pub pages: Vec<String>,
    /// Year for layouts whose rows omit it. Defaults to the ingestion year.
    pub statement_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementSummary {
    pub statement_id: StatementId,
    pub source_name: String,
    pub layout: String,
    pub pages: usize,
    pub empty_pages: usize,
    pub extracted: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub parse_failures: usize,
    pub zero_amount_skipped: usize,
    pub failures: Vec<ParseFailure>,
    pub warnings: Vec<String>,
}

/// Everything a batch produced before it touches the ledger.
struct Drafts {
    statement: NewStatement,
    transactions: Vec<ParsedTransaction>,
    failures: Vec<ParseFailure>,
    empty_pages: usize,
    zero_amount: usize,
    warnings: Vec<String>,
}

pub struct Ingestor {
    parsers: Vec<StatementParser>,
    categorizer: Categorizer,
}

impl Ingestor {
    /// Compile every built-in layout once.
    pub fn new(categories: &CategorySet) -> Result<Self, regex::Error> {
        let parsers = builtin_layouts()
            .iter()
            .map(StatementParser::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { parsers, categorizer: Categorizer::new(categories) })
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    fn parser_for(&self, layout: &str) -> Option<&StatementParser> {
        self.parsers
            .iter()
            .find(|p| p.layout().name.eq_ignore_ascii_case(layout.trim()))
    }

    pub fn ingest(
        &self,
        input: StatementInput,
        store: &dyn LedgerStore,
        now: NaiveDateTime,
    ) -> Result<StatementSummary, IngestError> {
        let parser = self
            .parser_for(&input.layout)
            .ok_or_else(|| IngestError::UnknownLayout(input.layout.clone()))?;
        if input.pages.iter().all(|p| p.trim().is_empty()) {
            return Err(IngestError::EmptyStatement(input.source_name));
        }

        // The record exists from here on but reaches the store only at commit.
        let statement = NewStatement {
            source_name: input.source_name,
            layout: parser.layout().name.to_string(),
            account_type: input.account_type,
            page_count: input.pages.len(),
            ingested_at: now,
        };
        let year = input.statement_year.unwrap_or_else(|| now.year());
        let parsed = parser.parse(&input.pages, input.account_type, Some(year));
        let drafts = Drafts {
            statement,
            transactions: parsed.transactions,
            failures: parsed.failures,
            empty_pages: parsed.empty_pages.len(),
            zero_amount: parsed.zero_amount,
            warnings: parsed.warnings,
        };
        self.commit(drafts, store)
    }

    /// Ingest several statements at once, one scoped thread per statement.
    /// Results come back in input order.
    pub fn ingest_many(
        &self,
        inputs: Vec<StatementInput>,
        store: &dyn LedgerStore,
        now: NaiveDateTime,
    ) -> Vec<Result<StatementSummary, IngestError>> {
        thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .into_iter()
                .map(|input| {
                    let source = input.source_name.clone();
                    (source, scope.spawn(move || self.ingest(input, store, now)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(source, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        warn!(%source, "ingest worker panicked");
                        Err(IngestError::WorkerPanicked(source))
                    })
                })
                .collect()
        })
    }

    /// Ingest a CSV export as one statement.
    pub fn ingest_csv<R: io::Read>(
        &self,
        source_name: &str,
        reader: R,
        account_type: AccountType,
        store: &dyn LedgerStore,
        now: NaiveDateTime,
    ) -> Result<StatementSummary, IngestError> {
        let import = parse_csv_export(reader, account_type)?;
        if import.transactions.is_empty() && import.failures.is_empty() && import.zero_amount == 0 {
            return Err(IngestError::EmptyStatement(source_name.to_string()));
        }
        let drafts = Drafts {
            statement: NewStatement {
                source_name: source_name.to_string(),
                layout: CSV_LAYOUT.to_string(),
                account_type,
                page_count: 1,
                ingested_at: now,
            },
            transactions: import.transactions,
            failures: import.failures,
            empty_pages: 0,
            zero_amount: import.zero_amount,
            warnings: Vec::new(),
        };
        self.commit(drafts, store)
    }

    fn commit(&self, drafts: Drafts, store: &dyn LedgerStore) -> Result<StatementSummary, IngestError> {
        let account_type = drafts.statement.account_type;
        let extracted = drafts.transactions.len();
        let statement = store.register_statement(drafts.statement)?;

        let split = partition(drafts.transactions, account_type, |fp| store.contains_fingerprint(fp))?;
        let mut duplicates = split.duplicates.len();

        let prepared: Vec<NewTransaction> = split
            .fresh
            .into_iter()
            .map(|fresh| {
                let category = self.categorizer.categorize(&fresh.draft.description).to_string();
                NewTransaction::from_parsed(fresh.draft, account_type, statement.id, category)
            })
            .collect();

        let mut inserted = 0;
        for transaction in prepared {
            match store.insert_if_absent(transaction) {
                Ok(InsertOutcome::Inserted(_)) => inserted += 1,
                // Lost a race with a concurrent batch carrying the same row.
                Ok(InsertOutcome::Duplicate) => duplicates += 1,
                Err(e) => {
                    // Rows already written stay; the statement records how many.
                    warn!(statement = %statement.id, inserted, error = %e, "commit interrupted");
                    if let Err(finalize) = store.finalize_statement(statement.id, extracted, inserted) {
                        warn!(statement = %statement.id, error = %finalize, "statement left unfinalized");
                    }
                    return Err(e.into());
                }
            }
        }

        let statement = store.finalize_statement(statement.id, extracted, inserted)?;
        for failure in &drafts.failures {
            debug!(source = %statement.source_name, %failure, "unparsed line group");
        }
        info!(
            statement = %statement.id,
            source = %statement.source_name,
            layout = %statement.layout,
            extracted,
            inserted,
            duplicates,
            parse_failures = drafts.failures.len(),
            zero_amount = drafts.zero_amount,
            "statement ingested"
        );

        Ok(StatementSummary {
            statement_id: statement.id,
            source_name: statement.source_name,
            layout: statement.layout,
            pages: statement.page_count,
            empty_pages: drafts.empty_pages,
            extracted,
            inserted,
            duplicates,
            parse_failures: drafts.failures.len(),
            zero_amount_skipped: drafts.zero_amount,
            failures: drafts.failures,
            warnings: drafts.warnings,
        })
    }
}
