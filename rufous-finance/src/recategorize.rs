//! Re-run the categorizer over stored rows, e.g. after editing the category
//! list in config.toml.

use rufous_core::UNCATEGORIZED;
use serde::Serialize;
use tracing::{debug, info};

use crate::category_rules::Categorizer;
use crate::ledger::{LedgerError, LedgerStore, TransactionFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecategorizeScope {
    /// Only rows still labelled `Uncategorized`; manual labels survive.
    #[default]
    Uncategorized,
    /// Every row, overwriting manual labels.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecategorizeSummary {
    pub examined: usize,
    pub changed: usize,
}

/// Rows whose label the categorizer would now set differently get the new
/// label. A row the rules no longer match keeps its old label.
pub fn recategorize(
    store: &dyn LedgerStore,
    categorizer: &Categorizer,
    scope: RecategorizeScope,
) -> Result<RecategorizeSummary, LedgerError> {
    let filter = match scope {
        RecategorizeScope::Uncategorized => {
            TransactionFilter { category: Some(UNCATEGORIZED.to_string()), ..Default::default() }
        }
        RecategorizeScope::All => TransactionFilter::default(),
    };

    let mut summary = RecategorizeSummary::default();
    for t in store.query(&filter)? {
        summary.examined += 1;
        let label = categorizer.categorize_merchant(&t.merchant);
        if label == UNCATEGORIZED || label == t.category {
            continue;
        }
        debug!(id = %t.id, from = %t.category, to = label, "recategorized");
        if store.set_category(t.id, label)? {
            summary.changed += 1;
        }
    }
    info!(examined = summary.examined, changed = summary.changed, "recategorize finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::ledger::fixtures::{statement, txn};
    use rufous_core::{Category, CategorySet};

    fn ledger() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        let s = ledger.register_statement(statement()).unwrap().id;
        for t in [
            txn(s, (2024, 3, 5), "BLUE BOTTLE COFFEE 17", -575, UNCATEGORIZED),
            txn(s, (2024, 3, 6), "BLUE BOTTLE COFFEE 17", -620, "Gifts"),
            txn(s, (2024, 3, 7), "ZZ UNKNOWN VENDOR", -1000, UNCATEGORIZED),
        ] {
            ledger.insert_if_absent(t).unwrap();
        }
        ledger
    }

    fn coffee_rules() -> Categorizer {
        Categorizer::new(&CategorySet::new(vec![Category::new("Coffee", None, &["BLUE BOTTLE"])]))
    }

    fn categories(store: &MemoryLedger) -> Vec<String> {
        store.query(&TransactionFilter::default()).unwrap().into_iter().map(|t| t.category).collect()
    }

    #[test]
    fn test_uncategorized_scope_keeps_manual_labels() {
        let store = ledger();
        let summary = recategorize(&store, &coffee_rules(), RecategorizeScope::Uncategorized).unwrap();
        assert_eq!(summary, RecategorizeSummary { examined: 2, changed: 1 });
        assert_eq!(categories(&store), vec!["Coffee", "Gifts", UNCATEGORIZED]);
    }

    #[test]
    fn test_all_scope_overwrites_and_is_idempotent() {
        let store = ledger();
        let first = recategorize(&store, &coffee_rules(), RecategorizeScope::All).unwrap();
        assert_eq!(first, RecategorizeSummary { examined: 3, changed: 2 });
        assert_eq!(categories(&store), vec!["Coffee", "Coffee", UNCATEGORIZED]);

        let again = recategorize(&store, &coffee_rules(), RecategorizeScope::All).unwrap();
        assert_eq!(again.changed, 0);
    }
}
