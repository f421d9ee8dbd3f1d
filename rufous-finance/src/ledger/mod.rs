//! The ledger store contract and its two implementations.
//!
//! A store owns transactions and statements. Writes go through
//! [`LedgerStore::insert_if_absent`] one record at a time: each insert is
//! atomic on its own, so an interrupted batch leaves a prefix behind and
//! never half a row.

use chrono::NaiveDate;
use rufous_core::{
    DateRange, Direction, Fingerprint, Granularity, NewStatement, NewTransaction, Statement,
    StatementId, Transaction, TransactionId, normalize_description,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("ledger lock poisoned")]
    Poisoned,
    #[error("invalid transaction: {0}")]
    InvalidRecord(&'static str),
    #[error("statement {0} does not exist")]
    UnknownStatement(StatementId),
    #[error("statement {0} is already finalized")]
    StatementFinalized(StatementId),
    #[error("corrupt row in ledger: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(TransactionId),
    /// The fingerprint was already stored; nothing was written.
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    DateAscending,
    DateDescending,
    /// Largest magnitude first, ties by date then id.
    LargestFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub range: Option<DateRange>,
    /// Category label, compared case-insensitively.
    pub category: Option<String>,
    /// Substring of the merchant name, compared after normalization.
    pub merchant: Option<String>,
    /// Substring of the location, any case. Rows without one never match.
    pub location: Option<String>,
    /// Substring of description, merchant, category or location, any case.
    pub search: Option<String>,
    pub direction: Option<Direction>,
    /// Keep transactions whose magnitude is strictly greater than this.
    pub above: Option<Decimal>,
    pub exclude_transfers: bool,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl TransactionFilter {
    /// Debits that are not card payments or account transfers.
    pub fn spending() -> Self {
        Self {
            direction: Some(Direction::Debit),
            exclude_transfers: true,
            ..Default::default()
        }
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn matches(&self, t: &Transaction) -> bool {
        if self.range.is_some_and(|r| !r.contains(t.date)) {
            return false;
        }
        if self.category.as_deref().is_some_and(|c| !t.category.eq_ignore_ascii_case(c.trim())) {
            return false;
        }
        if let Some(merchant) = &self.merchant {
            let needle = normalize_description(merchant);
            if !t.merchant.contains(&needle) {
                return false;
            }
        }
        if let Some(place) = &self.location {
            if !t.location.as_deref().is_some_and(|l| contains_ignore_case(l, place)) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let fields = [t.description.as_str(), t.merchant.as_str(), t.category.as_str()];
            let found = fields.into_iter().chain(t.location.as_deref()).any(|f| contains_ignore_case(f, term));
            if !found {
                return false;
            }
        }
        if self.direction.is_some_and(|d| d != t.direction) {
            return false;
        }
        if self.above.is_some_and(|min| t.magnitude() <= min) {
            return false;
        }
        !(self.exclude_transfers && t.is_transfer)
    }

    /// Filter, order and cap a set of rows the way every store must.
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a Transaction>) -> Vec<Transaction> {
        let mut out: Vec<Transaction> = rows.into_iter().filter(|t| self.matches(t)).cloned().collect();
        match self.order {
            SortOrder::DateAscending => out.sort_by(|a, b| (a.date, a.id).cmp(&(b.date, b.id))),
            SortOrder::DateDescending => out.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id))),
            SortOrder::LargestFirst => out.sort_by(|a, b| {
                b.magnitude()
                    .cmp(&a.magnitude())
                    .then(a.date.cmp(&b.date))
                    .then(a.id.cmp(&b.id))
            }),
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    Category,
    Merchant,
    /// Key is the ISO date of the bucket start.
    Period(Granularity),
}

impl GroupBy {
    pub fn key(&self, t: &Transaction) -> String {
        match self {
            GroupBy::Category => t.category.clone(),
            GroupBy::Merchant => t.merchant.clone(),
            GroupBy::Period(g) => g.period_start(t.date).to_string(),
        }
    }
}

/// Sum, count and mean of signed amounts in one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateRow {
    pub sum: Decimal,
    pub count: usize,
    pub avg: Decimal,
}

/// Group rows and total their signed amounts. `limit` and `order` on the
/// filter do not apply to aggregates.
pub fn fold_aggregate<'a>(
    group_by: GroupBy,
    filter: &TransactionFilter,
    rows: impl IntoIterator<Item = &'a Transaction>,
) -> BTreeMap<String, AggregateRow> {
    let mut out: BTreeMap<String, AggregateRow> = BTreeMap::new();
    for t in rows.into_iter().filter(|t| filter.matches(t)) {
        let row = out.entry(group_by.key(t)).or_default();
        row.sum += t.amount;
        row.count += 1;
    }
    for row in out.values_mut() {
        row.avg = (row.sum / Decimal::from(row.count)).round_dp(2);
    }
    out
}

/// Whole-ledger summary. Spending and income leave transfers out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub transactions: usize,
    pub statements: usize,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub net: Decimal,
}

impl LedgerStats {
    pub fn collect(transactions: &[Transaction], statements: usize) -> Self {
        let mut stats = LedgerStats {
            transactions: transactions.len(),
            statements,
            earliest: transactions.iter().map(|t| t.date).min(),
            latest: transactions.iter().map(|t| t.date).max(),
            ..Default::default()
        };
        for t in transactions.iter().filter(|t| !t.is_transfer) {
            match t.direction {
                Direction::Debit => stats.total_spent += t.magnitude(),
                Direction::Credit => stats.total_income += t.magnitude(),
            }
        }
        stats.net = stats.total_income - stats.total_spent;
        stats
    }
}

pub(crate) fn validate_category(category: &str) -> Result<(), LedgerError> {
    if category.trim().is_empty() {
        return Err(LedgerError::InvalidRecord("category is empty"));
    }
    Ok(())
}

pub(crate) fn validate(t: &NewTransaction) -> Result<(), LedgerError> {
    if t.amount.is_zero() {
        return Err(LedgerError::InvalidRecord("amount is zero"));
    }
    if t.description.trim().is_empty() {
        return Err(LedgerError::InvalidRecord("description is empty"));
    }
    if Direction::of(t.amount) != Some(t.direction) {
        return Err(LedgerError::InvalidRecord("direction disagrees with amount sign"));
    }
    Ok(())
}

/// Persistent home of transactions and statements.
///
/// Implementations must make `insert_if_absent` safe under concurrent calls:
/// of two racing inserts with the same fingerprint exactly one is stored.
pub trait LedgerStore: Send + Sync {
    fn register_statement(&self, statement: NewStatement) -> Result<Statement, LedgerError>;

    /// Write the final counts. A statement is finalized once.
    fn finalize_statement(
        &self,
        id: StatementId,
        extracted: usize,
        inserted: usize,
    ) -> Result<Statement, LedgerError>;

    fn statements(&self) -> Result<Vec<Statement>, LedgerError>;

    fn insert_if_absent(&self, transaction: NewTransaction) -> Result<InsertOutcome, LedgerError>;

    fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool, LedgerError>;

    fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, LedgerError>;

    fn aggregate(
        &self,
        group_by: GroupBy,
        filter: &TransactionFilter,
    ) -> Result<BTreeMap<String, AggregateRow>, LedgerError>;

    /// Replace one transaction's category. `Ok(false)` when no row has `id`.
    fn set_category(&self, id: TransactionId, category: &str) -> Result<bool, LedgerError>;

    /// Non-transfer rows mentioning `term` anywhere, newest first. A blank
    /// term finds nothing.
    fn search(&self, term: &str, limit: usize) -> Result<Vec<Transaction>, LedgerError> {
        if term.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.query(&TransactionFilter {
            search: Some(term.to_string()),
            exclude_transfers: true,
            order: SortOrder::DateDescending,
            limit: Some(limit),
            ..Default::default()
        })
    }

    fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let all = self.query(&TransactionFilter::default())?;
        Ok(LedgerStats::collect(&all, self.statements()?.len()))
    }

    /// Earliest stored transaction date, if any.
    fn first_date(&self) -> Result<Option<NaiveDate>, LedgerError> {
        let mut all = self.query(&TransactionFilter { limit: Some(1), ..Default::default() })?;
        Ok(all.pop().map(|t| t.date))
    }
}
