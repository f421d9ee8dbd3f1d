//! Statement layouts: the per-format tables the tokenizer and parser run on.
//!
//! A layout says how a transaction row starts (its date prefix), which date
//! formats are accepted, which lines are boilerplate, where the amount sits
//! and how the amount's sign maps to a direction for each account type.

use rufous_core::{AccountType, Direction};

use crate::parsers::{bmo_credit, capital_one_us, chase_debit, generic};

/// One accepted date format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    /// chrono format string, without the year when `needs_year` is set
    pub format: &'static str,
    /// Row dates omit the year (`Oct 12`, `04/22`); the statement year is appended.
    pub needs_year: bool,
}

/// Which monetary token on the row is the transaction amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountColumn {
    /// The last token on the row.
    Last,
    /// The token before a trailing running-balance column.
    BeforeBalance,
}

/// How an amount token's sign and markers map to a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionRule {
    /// `CR`/`DR` marker wins; otherwise negative or parenthesized is money out.
    SignedMarkers,
    /// `CR`/`DR` marker wins; otherwise positive is a charge (money out) and
    /// negative or parenthesized is a payment or refund (money in).
    ChargesPositive,
}

impl DirectionRule {
    pub fn direction(&self, negative: bool, marker: Option<Direction>) -> Direction {
        if let Some(marker) = marker {
            return marker;
        }
        match (self, negative) {
            (DirectionRule::SignedMarkers, true) => Direction::Debit,
            (DirectionRule::SignedMarkers, false) => Direction::Credit,
            (DirectionRule::ChargesPositive, true) => Direction::Credit,
            (DirectionRule::ChargesPositive, false) => Direction::Debit,
        }
    }
}

/// Direction rule per account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionTable {
    pub debit: DirectionRule,
    pub credit: DirectionRule,
}

impl DirectionTable {
    /// Checking statements print signed amounts; card statements print
    /// charges as positive numbers.
    pub const STANDARD: DirectionTable = DirectionTable {
        debit: DirectionRule::SignedMarkers,
        credit: DirectionRule::ChargesPositive,
    };

    pub fn rule(&self, account_type: AccountType) -> DirectionRule {
        match account_type {
            AccountType::Debit => self.debit,
            AccountType::Credit => self.credit,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatementLayout {
    pub name: &'static str,
    /// Anchored pattern for the leading date token(s). Captures `date`, and
    /// `posted` when the layout prints a posting date.
    pub date_prefix: &'static str,
    pub date_formats: &'static [DateFormat],
    /// Lines before this marker are ignored.
    pub section_start: Option<&'static str>,
    /// Closes the transaction section until the next start marker.
    pub section_end: Option<&'static str>,
    /// Extra line patterns dropped before grouping.
    pub boilerplate: &'static [&'static str],
    /// Patterns removed from descriptions.
    pub description_noise: &'static [&'static str],
    pub amount_column: AmountColumn,
    pub directions: DirectionTable,
    /// Card layouts print the city and region after the merchant.
    pub split_locations: bool,
}

static LAYOUTS: [StatementLayout; 4] = [
    generic::LAYOUT,
    chase_debit::LAYOUT,
    capital_one_us::LAYOUT,
    bmo_credit::LAYOUT,
];

pub fn builtin_layouts() -> &'static [StatementLayout] {
    &LAYOUTS
}

pub fn layout_by_name(name: &str) -> Option<&'static StatementLayout> {
    LAYOUTS.iter().find(|l| l.name.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_table_is_account_specific() {
        let t = DirectionTable::STANDARD;
        assert_eq!(t.rule(AccountType::Debit).direction(true, None), Direction::Debit);
        assert_eq!(t.rule(AccountType::Debit).direction(false, None), Direction::Credit);
        assert_eq!(t.rule(AccountType::Credit).direction(false, None), Direction::Debit);
        assert_eq!(t.rule(AccountType::Credit).direction(true, None), Direction::Credit);
    }

    #[test]
    fn test_marker_overrides_sign() {
        let rule = DirectionTable::STANDARD.rule(AccountType::Credit);
        assert_eq!(rule.direction(false, Some(Direction::Credit)), Direction::Credit);
    }

    #[test]
    fn test_layout_lookup() {
        assert_eq!(layout_by_name("Chase-Debit").map(|l| l.name), Some("chase-debit"));
        assert!(layout_by_name("unknown").is_none());
        let names: Vec<_> = builtin_layouts().iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["generic", "chase-debit", "capital-one", "bmo-credit"]);
    }
}
