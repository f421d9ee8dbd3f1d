//! Content fingerprints used to detect duplicate transactions across batches.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::merchant::compact_description;
use crate::transaction::AccountType;

/// SHA-256 (hex) over `date | compacted description | signed amount | account type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(
        date: NaiveDate,
        description: &str,
        amount: Decimal,
        account_type: AccountType,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            date,
            compact_description(description),
            amount.normalize(),
            account_type.as_str()
        ));
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap a previously computed hex digest (e.g. read back from storage).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
