//! Batch deduplication by content fingerprint.
//!
//! Two drafts with the same date, normalized description, signed amount and
//! account type are the same economic event, whichever statement or page
//! they came from. Genuinely repeated identical purchases (two coffees, same
//! shop, same day, same price) collapse into one.

use rufous_core::{AccountType, Fingerprint, ParsedTransaction};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintedDraft {
    pub fingerprint: Fingerprint,
    pub draft: ParsedTransaction,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub fresh: Vec<FingerprintedDraft>,
    pub duplicates: Vec<FingerprintedDraft>,
}

/// Split a batch into fresh and duplicate drafts, keeping batch order.
///
/// `is_known` asks the ledger whether a fingerprint is already stored.
/// Repeats inside the batch itself (overlapping pages) count as duplicates.
pub fn partition<E>(
    drafts: Vec<ParsedTransaction>,
    account_type: AccountType,
    mut is_known: impl FnMut(&Fingerprint) -> Result<bool, E>,
) -> Result<Partition, E> {
    let mut seen = HashSet::new();
    let mut out = Partition::default();

    for draft in drafts {
        let fingerprint = draft.fingerprint(account_type);
        let entry = FingerprintedDraft { fingerprint, draft };
        if !seen.insert(entry.fingerprint.clone()) || is_known(&entry.fingerprint)? {
            debug!(fingerprint = %entry.fingerprint, date = %entry.draft.date, "duplicate suppressed");
            out.duplicates.push(entry);
        } else {
            out.fresh.push(entry);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::convert::Infallible;

    fn draft(day: u32, desc: &str, cents: i64) -> ParsedTransaction {
        ParsedTransaction::new(NaiveDate::from_ymd_opt(2024, 3, day).unwrap(), desc, Decimal::new(cents, 2))
            .unwrap()
    }

    #[test]
    fn test_within_batch_repeats_are_duplicates() {
        let drafts = vec![draft(5, "STARBUCKS #1234", -575), draft(5, "Starbucks  #1234", -575), draft(6, "RENT", -140000)];
        let out = partition(drafts, AccountType::Debit, |_| Ok::<_, Infallible>(false)).unwrap();
        assert_eq!(out.fresh.len(), 2);
        assert_eq!(out.duplicates.len(), 1);
        assert_eq!(out.duplicates[0].draft.description, "Starbucks  #1234");
    }

    #[test]
    fn test_known_fingerprints_are_duplicates() {
        let known = draft(5, "STARBUCKS #1234", -575).fingerprint(AccountType::Debit);
        let drafts = vec![draft(5, "STARBUCKS #1234", -575), draft(7, "STARBUCKS #1234", -575)];
        let out = partition(drafts, AccountType::Debit, |fp| Ok::<_, Infallible>(*fp == known)).unwrap();
        assert_eq!(out.duplicates.len(), 1);
        assert_eq!(out.fresh[0].draft.date, NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
    }

    #[test]
    fn test_account_type_separates_events() {
        let drafts = vec![draft(5, "TRANSFER", -10000)];
        let known = drafts[0].fingerprint(AccountType::Credit);
        let out = partition(drafts, AccountType::Debit, |fp| Ok::<_, Infallible>(*fp == known)).unwrap();
        assert_eq!(out.fresh.len(), 1);
    }

    #[test]
    fn test_lookup_error_propagates() {
        let err = partition(vec![draft(5, "X", -100)], AccountType::Debit, |_| Err("store down"));
        assert_eq!(err, Err("store down"));
    }
}
