//! SQLite-backed ledger.
//!
//! Duplicate suppression is the `UNIQUE` constraint on `fingerprint` plus
//! `ON CONFLICT DO NOTHING`, so it also holds between separate processes
//! sharing one database file. Dates and decimals are stored as text;
//! grouping runs in Rust over the filtered rows.

use chrono::{NaiveDate, NaiveDateTime};
use rufous_core::{
    AccountType, Direction, Fingerprint, NewStatement, NewTransaction, Statement, StatementId,
    Transaction, TransactionId,
};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::Value};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    AggregateRow, GroupBy, InsertOutcome, LedgerError, LedgerStore, TransactionFilter,
    fold_aggregate, validate, validate_category,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS statement (
    id INTEGER PRIMARY KEY,
    source_name TEXT NOT NULL,
    layout TEXT NOT NULL,
    account_type TEXT NOT NULL,
    page_count INTEGER NOT NULL,
    transactions_extracted INTEGER NOT NULL DEFAULT 0,
    transactions_inserted INTEGER NOT NULL DEFAULT 0,
    ingested_at TEXT NOT NULL,
    finalized INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS ledger_transaction (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    posted_date TEXT,
    description TEXT NOT NULL,
    amount TEXT NOT NULL,
    direction TEXT NOT NULL,
    category TEXT NOT NULL,
    merchant TEXT NOT NULL,
    location TEXT,
    account_type TEXT NOT NULL,
    statement_id INTEGER NOT NULL REFERENCES statement(id),
    fingerprint TEXT NOT NULL UNIQUE,
    is_transfer INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS ledger_transaction_date ON ledger_transaction(date);
";

const TRANSACTION_COLUMNS: &str = "id, date, posted_date, description, amount, direction, category, \
     merchant, location, account_type, statement_id, fingerprint, is_transfer";

const STATEMENT_COLUMNS: &str = "id, source_name, layout, account_type, page_count, \
     transactions_extracted, transactions_inserted, ingested_at, finalized";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// SQLITE_CONSTRAINT_FOREIGNKEY
const FOREIGN_KEY_VIOLATION: i32 = 787;

#[derive(Debug, Clone)]
pub struct SqliteLedger {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        Self::new(Arc::new(Mutex::new(Connection::open(path)?)))
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::new(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    /// Wrap a connection, creating the tables if they are missing.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Result<Self, LedgerError> {
        {
            let conn = connection.lock().map_err(|_| LedgerError::Poisoned)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch(SCHEMA)?;
        }
        Ok(Self { connection })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.connection.lock().map_err(|_| LedgerError::Poisoned)
    }

    fn get_statement(conn: &Connection, id: StatementId) -> Result<Option<Statement>, LedgerError> {
        let raw = conn
            .query_row(
                &format!("SELECT {STATEMENT_COLUMNS} FROM statement WHERE id = ?1"),
                [id.0 as i64],
                RawStatement::from_row,
            )
            .optional()?;
        raw.map(RawStatement::into_statement).transpose()
    }

    /// Rows passing the filter's range, category, direction and transfer
    /// clauses. The rest of the filter is applied by the caller.
    fn prefiltered(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, LedgerError> {
        let mut clauses = vec![];
        let mut values: Vec<Value> = vec![];

        if let Some(range) = filter.range {
            clauses.push(format!("date >= ?{} AND date < ?{}", values.len() + 1, values.len() + 2));
            values.push(Value::Text(range.start.to_string()));
            values.push(Value::Text(range.end.to_string()));
        }
        if let Some(category) = &filter.category {
            clauses.push(format!("category = ?{} COLLATE NOCASE", values.len() + 1));
            values.push(Value::Text(category.trim().to_string()));
        }
        if let Some(direction) = filter.direction {
            clauses.push(format!("direction = ?{}", values.len() + 1));
            values.push(Value::Text(direction.as_str().to_string()));
        }
        if filter.exclude_transfers {
            clauses.push("is_transfer = 0".to_string());
        }

        let mut sql = format!("SELECT {TRANSACTION_COLUMNS} FROM ledger_transaction");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY date, id");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
            .query_map(params_from_iter(values.iter()), RawTransaction::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawTransaction::into_transaction).collect()
    }
}

impl LedgerStore for SqliteLedger {
    fn register_statement(&self, statement: NewStatement) -> Result<Statement, LedgerError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO statement (source_name, layout, account_type, page_count, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                statement.source_name,
                statement.layout,
                statement.account_type.as_str(),
                statement.page_count as i64,
                statement.ingested_at.format(DATETIME_FORMAT).to_string(),
            ],
        )?;
        let id = StatementId(conn.last_insert_rowid() as u64);
        Ok(Statement::registered(id, statement))
    }

    fn finalize_statement(
        &self,
        id: StatementId,
        extracted: usize,
        inserted: usize,
    ) -> Result<Statement, LedgerError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE statement
             SET transactions_extracted = ?2, transactions_inserted = ?3, finalized = 1
             WHERE id = ?1 AND finalized = 0",
            params![id.0 as i64, extracted as i64, inserted as i64],
        )?;
        let stored = Self::get_statement(&conn, id)?.ok_or(LedgerError::UnknownStatement(id))?;
        if changed == 0 {
            return Err(LedgerError::StatementFinalized(id));
        }
        Ok(stored)
    }

    fn statements(&self) -> Result<Vec<Statement>, LedgerError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {STATEMENT_COLUMNS} FROM statement ORDER BY id"))?;
        let raws = stmt
            .query_map([], RawStatement::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawStatement::into_statement).collect()
    }

    fn insert_if_absent(&self, t: NewTransaction) -> Result<InsertOutcome, LedgerError> {
        validate(&t)?;
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "INSERT INTO ledger_transaction (date, posted_date, description, amount, direction,
                     category, merchant, location, account_type, statement_id, fingerprint, is_transfer)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(fingerprint) DO NOTHING",
                params![
                    t.date.to_string(),
                    t.posted_date.map(|d| d.to_string()),
                    t.description,
                    t.amount.to_string(),
                    t.direction.as_str(),
                    t.category,
                    t.merchant,
                    t.location,
                    t.account_type.as_str(),
                    t.source_statement_id.0 as i64,
                    t.fingerprint.as_str(),
                    t.is_transfer,
                ],
            )
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(e, _) if e.extended_code == FOREIGN_KEY_VIOLATION => {
                    LedgerError::UnknownStatement(t.source_statement_id)
                }
                error => error.into(),
            })?;

        if changed == 0 {
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::Inserted(TransactionId(conn.last_insert_rowid() as u64)))
    }

    fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool, LedgerError> {
        let found = self
            .conn()?
            .query_row(
                "SELECT 1 FROM ledger_transaction WHERE fingerprint = ?1",
                [fingerprint.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, LedgerError> {
        Ok(filter.apply(&self.prefiltered(filter)?))
    }

    fn aggregate(
        &self,
        group_by: GroupBy,
        filter: &TransactionFilter,
    ) -> Result<BTreeMap<String, AggregateRow>, LedgerError> {
        Ok(fold_aggregate(group_by, filter, &self.prefiltered(filter)?))
    }

    fn set_category(&self, id: TransactionId, category: &str) -> Result<bool, LedgerError> {
        validate_category(category)?;
        let changed = self.conn()?.execute(
            "UPDATE ledger_transaction SET category = ?2 WHERE id = ?1",
            params![id.0 as i64, category.trim()],
        )?;
        Ok(changed > 0)
    }
}

struct RawTransaction {
    id: i64,
    date: String,
    posted_date: Option<String>,
    description: String,
    amount: String,
    direction: String,
    category: String,
    merchant: String,
    location: Option<String>,
    account_type: String,
    statement_id: i64,
    fingerprint: String,
    is_transfer: bool,
}

impl RawTransaction {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            posted_date: row.get(2)?,
            description: row.get(3)?,
            amount: row.get(4)?,
            direction: row.get(5)?,
            category: row.get(6)?,
            merchant: row.get(7)?,
            location: row.get(8)?,
            account_type: row.get(9)?,
            statement_id: row.get(10)?,
            fingerprint: row.get(11)?,
            is_transfer: row.get(12)?,
        })
    }

    fn into_transaction(self) -> Result<Transaction, LedgerError> {
        let posted_date = self.posted_date.as_deref().map(parse_date).transpose()?;
        Ok(Transaction {
            id: TransactionId(self.id as u64),
            date: parse_date(&self.date)?,
            posted_date,
            description: self.description,
            amount: Decimal::from_str(&self.amount)
                .map_err(|e| LedgerError::Corrupt(format!("amount {:?}: {e}", self.amount)))?,
            direction: Direction::from_str(&self.direction).map_err(LedgerError::Corrupt)?,
            category: self.category,
            merchant: self.merchant,
            location: self.location,
            account_type: AccountType::from_str(&self.account_type).map_err(LedgerError::Corrupt)?,
            source_statement_id: StatementId(self.statement_id as u64),
            fingerprint: Fingerprint::from_hex(self.fingerprint),
            is_transfer: self.is_transfer,
        })
    }
}

struct RawStatement {
    id: i64,
    source_name: String,
    layout: String,
    account_type: String,
    page_count: i64,
    extracted: i64,
    inserted: i64,
    ingested_at: String,
    finalized: bool,
}

impl RawStatement {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_name: row.get(1)?,
            layout: row.get(2)?,
            account_type: row.get(3)?,
            page_count: row.get(4)?,
            extracted: row.get(5)?,
            inserted: row.get(6)?,
            ingested_at: row.get(7)?,
            finalized: row.get(8)?,
        })
    }

    fn into_statement(self) -> Result<Statement, LedgerError> {
        Ok(Statement {
            id: StatementId(self.id as u64),
            source_name: self.source_name,
            layout: self.layout,
            account_type: AccountType::from_str(&self.account_type).map_err(LedgerError::Corrupt)?,
            page_count: self.page_count as usize,
            transactions_extracted: self.extracted as usize,
            transactions_inserted: self.inserted as usize,
            ingested_at: NaiveDateTime::parse_from_str(&self.ingested_at, DATETIME_FORMAT)
                .map_err(|e| LedgerError::Corrupt(format!("ingested_at {:?}: {e}", self.ingested_at)))?,
            finalized: self.finalized,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| LedgerError::Corrupt(format!("date {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::{statement, txn};
    use rufous_core::{DateRange, Granularity};
    use std::thread;

    fn ledger() -> (SqliteLedger, StatementId) {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let s = ledger.register_statement(statement()).unwrap();
        (ledger, s.id)
    }

    #[test]
    fn test_unique_fingerprint_suppresses_duplicates() {
        let (ledger, s) = ledger();
        let t = txn(s, (2024, 3, 5), "STARBUCKS #1234", -575, "Food & Dining");

        assert!(matches!(ledger.insert_if_absent(t.clone()).unwrap(), InsertOutcome::Inserted(_)));
        assert_eq!(ledger.insert_if_absent(t.clone()).unwrap(), InsertOutcome::Duplicate);
        assert!(ledger.contains_fingerprint(&t.fingerprint).unwrap());

        let rows = ledger.query(&TransactionFilter::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, Decimal::new(-575, 2));
        assert_eq!(rows[0].merchant, "STARBUCKS");
        assert_eq!(rows[0].fingerprint, t.fingerprint);
    }

    #[test]
    fn test_concurrent_inserts_share_one_connection() {
        let (ledger, s) = ledger();
        let t = txn(s, (2024, 3, 5), "STARBUCKS #1234", -575, "Food & Dining");

        let outcomes: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| ledger.insert_if_absent(t.clone()).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(outcomes.iter().filter(|o| **o != InsertOutcome::Duplicate).count(), 1);
    }

    #[test]
    fn test_unknown_statement_is_rejected() {
        let (ledger, _) = ledger();
        let orphan = txn(StatementId(42), (2024, 3, 5), "COFFEE", -100, "X");
        assert!(matches!(ledger.insert_if_absent(orphan), Err(LedgerError::UnknownStatement(_))));
    }

    #[test]
    fn test_filters_and_aggregates_match_memory_semantics() {
        let (ledger, s) = ledger();
        for t in [
            txn(s, (2024, 2, 28), "STARBUCKS #1234", -575, "Food & Dining"),
            txn(s, (2024, 3, 5), "starbucks #1234", -620, "food & dining"),
            txn(s, (2024, 3, 9), "UBER TRIP", -1850, "Transportation"),
            txn(s, (2024, 3, 15), "PAYROLL ACME", 125000, "Uncategorized"),
        ] {
            ledger.insert_if_absent(t).unwrap();
        }

        let march = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        )
        .unwrap();
        let filter = TransactionFilter::spending().within(march);
        let by_category = ledger.aggregate(GroupBy::Category, &filter).unwrap();
        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category["food & dining"].sum, Decimal::new(-620, 2));

        let food = TransactionFilter { category: Some("FOOD & DINING".into()), ..Default::default() };
        assert_eq!(ledger.query(&food).unwrap().len(), 2);

        let by_month = ledger
            .aggregate(GroupBy::Period(Granularity::Month), &TransactionFilter::default())
            .unwrap();
        assert_eq!(by_month["2024-03-01"].count, 3);
    }

    #[test]
    fn test_location_and_category_updates_persist() {
        let (ledger, s) = ledger();
        let mut tims = txn(s, (2024, 10, 12), "TIM HORTONS #1234", -543, "Uncategorized");
        tims.location = Some("Toronto, Ontario, Canada".to_string());
        let InsertOutcome::Inserted(id) = ledger.insert_if_absent(tims).unwrap() else {
            panic!("expected an insert")
        };
        ledger.insert_if_absent(txn(s, (2024, 10, 13), "UBER TRIP", -1850, "Transportation")).unwrap();

        assert!(ledger.set_category(id, "Food & Dining").unwrap());
        assert!(!ledger.set_category(TransactionId(999), "Food & Dining").unwrap());

        let found = ledger.search("ontario", 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].location.as_deref(), Some("Toronto, Ontario, Canada"));
        assert_eq!(found[0].category, "Food & Dining");

        let stats = ledger.stats().unwrap();
        assert_eq!((stats.transactions, stats.statements), (2, 1));
        assert_eq!(stats.total_spent, Decimal::new(2393, 2));
    }

    #[test]
    fn test_statement_lifecycle_round_trips() {
        let (ledger, s) = ledger();
        ledger.finalize_statement(s, 4, 3).unwrap();
        assert!(matches!(ledger.finalize_statement(s, 4, 3), Err(LedgerError::StatementFinalized(_))));
        assert!(matches!(
            ledger.finalize_statement(StatementId(9), 0, 0),
            Err(LedgerError::UnknownStatement(_))
        ));

        let all = ledger.statements().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].transactions_inserted, 3);
        assert!(all[0].finalized);
        assert_eq!(all[0].ingested_at, statement().ingested_at);
    }
}
