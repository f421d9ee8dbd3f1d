//! In-process ledger behind one `RwLock`.

use rufous_core::{
    Fingerprint, NewStatement, NewTransaction, Statement, StatementId, Transaction, TransactionId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    AggregateRow, GroupBy, InsertOutcome, LedgerError, LedgerStore, TransactionFilter,
    fold_aggregate, validate, validate_category,
};

#[derive(Debug, Default)]
struct Inner {
    transactions: Vec<Transaction>,
    by_fingerprint: HashMap<Fingerprint, TransactionId>,
    statements: Vec<Statement>,
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, LedgerError> {
        self.inner.write().map_err(|_| LedgerError::Poisoned)
    }
}

impl LedgerStore for MemoryLedger {
    fn register_statement(&self, statement: NewStatement) -> Result<Statement, LedgerError> {
        let mut inner = self.write()?;
        let id = StatementId(inner.statements.len() as u64 + 1);
        let stored = Statement::registered(id, statement);
        inner.statements.push(stored.clone());
        Ok(stored)
    }

    fn finalize_statement(
        &self,
        id: StatementId,
        extracted: usize,
        inserted: usize,
    ) -> Result<Statement, LedgerError> {
        let mut inner = self.write()?;
        let statement = inner
            .statements
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(LedgerError::UnknownStatement(id))?;
        if statement.finalized {
            return Err(LedgerError::StatementFinalized(id));
        }
        statement.transactions_extracted = extracted;
        statement.transactions_inserted = inserted;
        statement.finalized = true;
        Ok(statement.clone())
    }

    fn statements(&self) -> Result<Vec<Statement>, LedgerError> {
        Ok(self.read()?.statements.clone())
    }

    fn insert_if_absent(&self, transaction: NewTransaction) -> Result<InsertOutcome, LedgerError> {
        validate(&transaction)?;
        // Lookup and push happen under the same write guard.
        let mut inner = self.write()?;
        if !inner.statements.iter().any(|s| s.id == transaction.source_statement_id) {
            return Err(LedgerError::UnknownStatement(transaction.source_statement_id));
        }
        if inner.by_fingerprint.contains_key(&transaction.fingerprint) {
            return Ok(InsertOutcome::Duplicate);
        }
        let id = TransactionId(inner.transactions.len() as u64 + 1);
        inner.by_fingerprint.insert(transaction.fingerprint.clone(), id);
        inner.transactions.push(transaction.into_transaction(id));
        Ok(InsertOutcome::Inserted(id))
    }

    fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool, LedgerError> {
        Ok(self.read()?.by_fingerprint.contains_key(fingerprint))
    }

    fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, LedgerError> {
        Ok(filter.apply(&self.read()?.transactions))
    }

    fn aggregate(
        &self,
        group_by: GroupBy,
        filter: &TransactionFilter,
    ) -> Result<BTreeMap<String, AggregateRow>, LedgerError> {
        Ok(fold_aggregate(group_by, filter, &self.read()?.transactions))
    }

    fn set_category(&self, id: TransactionId, category: &str) -> Result<bool, LedgerError> {
        validate_category(category)?;
        let mut inner = self.write()?;
        match inner.transactions.iter_mut().find(|t| t.id == id) {
            Some(t) => {
                t.category = category.trim().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
