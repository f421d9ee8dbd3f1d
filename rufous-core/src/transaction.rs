//! Transaction and statement records shared by the ingest and ledger crates.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::fingerprint::Fingerprint;
use crate::merchant;

/// Kind of account a statement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Checking / chequing account
    Debit,
    /// Credit card
    Credit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Debit => "debit",
            AccountType::Credit => "credit",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" | "checking" | "chequing" => Ok(AccountType::Debit),
            "credit" | "credit-card" | "creditcard" => Ok(AccountType::Credit),
            other => Err(format!("unknown account type: {other}")),
        }
    }
}

/// Whether money leaves (debit) or enters (credit) the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    /// Direction implied by a signed amount; `None` for zero.
    pub fn of(amount: Decimal) -> Option<Self> {
        if amount.is_zero() {
            None
        } else if amount.is_sign_negative() {
            Some(Direction::Debit)
        } else {
            Some(Direction::Credit)
        }
    }

    /// Apply this direction to an unsigned magnitude.
    pub fn signed(&self, magnitude: Decimal) -> Decimal {
        match self {
            Direction::Debit => -magnitude.abs(),
            Direction::Credit => magnitude.abs(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(Direction::Debit),
            "credit" => Ok(Direction::Credit),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parser output: one statement row before dedup and categorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    /// Posting date, for layouts that print both.
    pub posted_date: Option<NaiveDate>,
    pub description: String,
    /// Negative = money out, positive = money in. Never zero.
    pub amount: Decimal,
    pub direction: Direction,
    /// Running balance printed next to the amount, if the layout has one.
    pub balance: Option<Decimal>,
    /// Place of purchase lifted off the description, e.g. `Toronto, Ontario, Canada`.
    pub location: Option<String>,
}

impl ParsedTransaction {
    /// Build a draft from a signed amount. Returns `None` for zero amounts.
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Decimal) -> Option<Self> {
        let direction = Direction::of(amount)?;
        Some(Self {
            date,
            posted_date: None,
            description: description.into(),
            amount,
            direction,
            balance: None,
            location: None,
        })
    }

    pub fn fingerprint(&self, account_type: AccountType) -> Fingerprint {
        Fingerprint::compute(self.date, &self.description, self.amount, account_type)
    }
}

/// A fully prepared record, ready for `insert_if_absent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
    pub description: String,
    pub amount: Decimal,
    pub direction: Direction,
    pub category: String,
    pub merchant: String,
    pub location: Option<String>,
    pub account_type: AccountType,
    pub source_statement_id: StatementId,
    pub fingerprint: Fingerprint,
    pub is_transfer: bool,
}

impl NewTransaction {
    pub fn from_parsed(
        parsed: ParsedTransaction,
        account_type: AccountType,
        source_statement_id: StatementId,
        category: impl Into<String>,
    ) -> Self {
        let fingerprint = parsed.fingerprint(account_type);
        Self {
            merchant: merchant::merchant_name(&parsed.description),
            is_transfer: merchant::is_transfer(&parsed.description),
            date: parsed.date,
            posted_date: parsed.posted_date,
            description: parsed.description,
            amount: parsed.amount,
            direction: parsed.direction,
            category: category.into(),
            location: parsed.location,
            account_type,
            source_statement_id,
            fingerprint,
        }
    }

    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            date: self.date,
            posted_date: self.posted_date,
            description: self.description,
            amount: self.amount,
            direction: self.direction,
            category: self.category,
            merchant: self.merchant,
            location: self.location,
            account_type: self.account_type,
            source_statement_id: self.source_statement_id,
            fingerprint: self.fingerprint,
            is_transfer: self.is_transfer,
        }
    }
}

/// A transaction as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
    pub description: String,
    pub amount: Decimal,
    pub direction: Direction,
    pub category: String,
    pub merchant: String,
    pub location: Option<String>,
    pub account_type: AccountType,
    pub source_statement_id: StatementId,
    pub fingerprint: Fingerprint,
    pub is_transfer: bool,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.direction == Direction::Debit
    }

    pub fn is_income(&self) -> bool {
        self.direction == Direction::Credit
    }

    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }
}

/// Statement metadata captured when a batch is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStatement {
    pub source_name: String,
    pub layout: String,
    pub account_type: AccountType,
    pub page_count: usize,
    pub ingested_at: NaiveDateTime,
}

/// One ingestion batch. Counts are written once, when the batch finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    pub source_name: String,
    pub layout: String,
    pub account_type: AccountType,
    pub page_count: usize,
    pub transactions_extracted: usize,
    pub transactions_inserted: usize,
    pub ingested_at: NaiveDateTime,
    pub finalized: bool,
}

impl Statement {
    pub fn registered(id: StatementId, new: NewStatement) -> Self {
        Self {
            id,
            source_name: new.source_name,
            layout: new.layout,
            account_type: new.account_type,
            page_count: new.page_count,
            transactions_extracted: 0,
            transactions_inserted: 0,
            ingested_at: new.ingested_at,
            finalized: false,
        }
    }
}
