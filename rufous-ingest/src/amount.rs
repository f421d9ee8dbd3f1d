//! Monetary token recognition.
//!
//! Accepted shapes: `5.75`, `-5.75`, `$1,234.56`, `- $14.05`, `(45.00)`,
//! `45.00-`, `29.22 CR`. Exactly two decimals are required, so store
//! numbers and reference ids at the end of a description never read as
//! amounts.

use regex::{Captures, Regex};
use rust_decimal::Decimal;
use rufous_core::Direction;
use std::str::FromStr;

use crate::layout::AmountColumn;

const AMOUNT: &str = concat!(
    r"(?P<lead>-\s*)?(?P<open>\()?\s*(?P<cur>[$€£])?\s*(?P<inner>-)?",
    r"(?P<num>\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})",
    r"\s*(?P<close>\))?(?P<trail>-)?(?:\s*(?P<marker>CR|DR)\b)?",
);

const BALANCE: &str = r"(?P<balance>-?\$?(?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2})";

/// An amount as printed: unsigned magnitude plus the sign cues around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAmount {
    pub magnitude: Decimal,
    /// Leading or trailing minus, or enclosing parentheses.
    pub negative: bool,
    /// Explicit `CR` / `DR` marker.
    pub marker: Option<Direction>,
    pub balance: Option<Decimal>,
}

impl RawAmount {
    /// Signed value by sign cues alone (markers ignored).
    pub fn signed(&self) -> Decimal {
        if self.negative {
            -self.magnitude
        } else {
            self.magnitude
        }
    }
}

/// A trailing amount match: where it starts in the line, and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingAmount {
    pub start: usize,
    pub amount: RawAmount,
}

#[derive(Debug, Clone)]
pub struct AmountPattern {
    token: Regex,
    trailing: Regex,
}

impl AmountPattern {
    pub fn new(column: AmountColumn) -> Result<Self, regex::Error> {
        let trailing = match column {
            AmountColumn::Last => format!(r"(?:^|\s){AMOUNT}\s*$"),
            AmountColumn::BeforeBalance => format!(r"(?:^|\s){AMOUNT}\s+{BALANCE}\s*$"),
        };
        Ok(Self {
            token: Regex::new(&format!(r"^\s*{AMOUNT}\s*$"))?,
            trailing: Regex::new(&trailing)?,
        })
    }

    /// Parse a standalone amount token.
    pub fn parse(&self, text: &str) -> Option<RawAmount> {
        self.token.captures(text).and_then(|caps| raw_amount(&caps))
    }

    /// Find the amount (and balance, if the layout has one) at the end of a line.
    pub fn trailing(&self, line: &str) -> Option<TrailingAmount> {
        let caps = self.trailing.captures(line)?;
        let start = caps.get(0)?.start();
        Some(TrailingAmount { start, amount: raw_amount(&caps)? })
    }
}

fn raw_amount(caps: &Captures<'_>) -> Option<RawAmount> {
    let magnitude = Decimal::from_str(&caps.name("num")?.as_str().replace(',', "")).ok()?;
    let has = |name: &str| caps.name(name).is_some();
    let negative =
        has("lead") || has("inner") || has("trail") || (has("open") && has("close"));
    let marker = caps.name("marker").map(|m| match m.as_str() {
        "CR" => Direction::Credit,
        _ => Direction::Debit,
    });
    let balance = caps
        .name("balance")
        .and_then(|b| Decimal::from_str(&b.as_str().replace([',', '$'], "")).ok());

    Some(RawAmount { magnitude, negative, marker, balance })
}
