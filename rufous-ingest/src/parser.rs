//! Candidate group → transaction draft.

use chrono::NaiveDate;
use regex::Regex;
use rufous_core::{
    AccountType, ExtractionInputError, ParseFailure, ParseFailureReason, ParsedTransaction,
};
use tracing::debug;

use crate::amount::{AmountPattern, RawAmount};
use crate::layout::StatementLayout;
use crate::location::split_location;
use crate::tokenizer::Tokenizer;
use crate::types::CandidateGroup;

#[derive(Debug, Clone)]
pub struct TransactionParser {
    layout: StatementLayout,
    date_prefix: Regex,
    amounts: AmountPattern,
    noise: Vec<Regex>,
}

impl TransactionParser {
    pub fn new(layout: &StatementLayout) -> Result<Self, regex::Error> {
        Ok(Self {
            layout: *layout,
            date_prefix: Regex::new(layout.date_prefix)?,
            amounts: AmountPattern::new(layout.amount_column)?,
            noise: layout
                .description_noise
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Parse one group. `Ok(None)` means the row printed a zero amount.
    pub fn parse(
        &self,
        group: &CandidateGroup,
        account_type: AccountType,
        statement_year: Option<i32>,
    ) -> Result<Option<ParsedTransaction>, ParseFailure> {
        let fail = |reason: ParseFailureReason| ParseFailure {
            page: group.page,
            line: group.line,
            text: group.text(),
            reason,
        };

        let first = group.lines.first().map(String::as_str).unwrap_or("");
        let caps = self
            .date_prefix
            .captures(first)
            .ok_or_else(|| fail(ParseFailureReason::UnrecognizedDate))?;
        let date = self.parse_date(&caps["date"], statement_year).map_err(fail)?;
        let posted_date = caps
            .name("posted")
            .and_then(|m| self.parse_date(m.as_str(), statement_year).ok());
        let rest = caps.get(0).map_or(first, |m| &first[m.end()..]);

        let continuation = group.lines.get(1..).unwrap_or_default();
        let (amount, middle) = self
            .split_amount(rest, continuation)
            .ok_or_else(|| fail(ParseFailureReason::MissingAmount))?;

        let description = self.clean_description(&middle);
        if description.is_empty() {
            return Err(fail(ParseFailureReason::EmptyDescription));
        }
        let located = self.layout.split_locations.then(|| split_location(&description)).flatten();
        let (location, description) = match located {
            Some((place, rest)) => (Some(place), rest),
            None => (None, description),
        };

        let direction = self
            .layout
            .directions
            .rule(account_type)
            .direction(amount.negative, amount.marker);
        let Some(mut parsed) = ParsedTransaction::new(date, description, direction.signed(amount.magnitude))
        else {
            return Ok(None);
        };
        parsed.posted_date = posted_date;
        parsed.balance = amount.balance;
        parsed.location = location;
        Ok(Some(parsed))
    }

    /// Amount from the end of the first row, else from the end of the last
    /// continuation line. Returns the amount and the description text around it.
    fn split_amount(&self, rest: &str, continuation: &[String]) -> Option<(RawAmount, Vec<String>)> {
        if let Some(found) = self.amounts.trailing(rest) {
            let mut middle = vec![rest[..found.start].to_string()];
            middle.extend(continuation.iter().cloned());
            return Some((found.amount, middle));
        }

        let (last, between) = continuation.split_last()?;
        let found = self.amounts.trailing(last)?;
        let mut middle = vec![rest.to_string()];
        middle.extend(between.iter().cloned());
        middle.push(last[..found.start].to_string());
        Some((found.amount, middle))
    }

    fn clean_description(&self, parts: &[String]) -> String {
        let mut text = parts.join(" ");
        for re in &self.noise {
            text = re.replace_all(&text, " ").into_owned();
        }
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn parse_date(&self, token: &str, year: Option<i32>) -> Result<NaiveDate, ParseFailureReason> {
        let token = token.replace('.', "");
        let token = token.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut wanted_year = false;

        for fmt in self.layout.date_formats {
            let parsed = if fmt.needs_year {
                let Some(year) = year else {
                    wanted_year = true;
                    continue;
                };
                NaiveDate::parse_from_str(&format!("{token} {year}"), &format!("{} %Y", fmt.format))
            } else {
                NaiveDate::parse_from_str(&token, fmt.format)
            };
            if let Ok(date) = parsed {
                return Ok(date);
            }
        }

        if wanted_year {
            Err(ParseFailureReason::MissingYear)
        } else {
            Err(ParseFailureReason::UnrecognizedDate)
        }
    }
}

/// Everything one statement's pages produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementParse {
    pub transactions: Vec<ParsedTransaction>,
    pub failures: Vec<ParseFailure>,
    pub empty_pages: Vec<ExtractionInputError>,
    pub warnings: Vec<String>,
    pub zero_amount: usize,
    pub groups: usize,
}

/// Tokenizer and parser for one layout, compiled once and reused.
#[derive(Debug, Clone)]
pub struct StatementParser {
    tokenizer: Tokenizer,
    parser: TransactionParser,
}

impl StatementParser {
    pub fn new(layout: &StatementLayout) -> Result<Self, regex::Error> {
        Ok(Self {
            tokenizer: Tokenizer::new(layout)?,
            parser: TransactionParser::new(layout)?,
        })
    }

    pub fn layout(&self) -> &StatementLayout {
        &self.parser.layout
    }

    pub fn parse<S: AsRef<str>>(
        &self,
        pages: &[S],
        account_type: AccountType,
        statement_year: Option<i32>,
    ) -> StatementParse {
        let tokenized = self.tokenizer.tokenize(pages);
        let mut out = StatementParse {
            empty_pages: tokenized.empty_pages,
            warnings: tokenized.warnings,
            groups: tokenized.groups.len(),
            ..Default::default()
        };

        for group in &tokenized.groups {
            match self.parser.parse(group, account_type, statement_year) {
                Ok(Some(t)) => out.transactions.push(t),
                Ok(None) => out.zero_amount += 1,
                Err(failure) => {
                    debug!(%failure, "parse failure");
                    out.failures.push(failure);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::generic;
    use rufous_core::Direction;
    use rust_decimal::Decimal;

    fn group(lines: &[&str]) -> CandidateGroup {
        CandidateGroup { page: 1, line: 4, lines: lines.iter().map(|l| l.to_string()).collect() }
    }

    fn parser() -> TransactionParser {
        TransactionParser::new(&generic::LAYOUT).unwrap()
    }

    #[test]
    fn test_amount_on_continuation_line() {
        let parsed = parser()
            .parse(&group(&["2024-03-05 AMAZON MKTPLACE", "AMZN.COM/BILL WA -23.10"]), AccountType::Debit, None)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.description, "AMAZON MKTPLACE AMZN.COM/BILL WA");
        assert_eq!(parsed.amount, Decimal::new(-2310, 2));
    }

    #[test]
    fn test_missing_amount_is_failure() {
        let err = parser()
            .parse(&group(&["2024-03-05 STARBUCKS #1234"]), AccountType::Debit, None)
            .unwrap_err();
        assert_eq!(err.reason, ParseFailureReason::MissingAmount);
        assert_eq!((err.page, err.line), (1, 4));
    }

    #[test]
    fn test_impossible_date_is_failure() {
        let err = parser()
            .parse(&group(&["2024-02-30 STARBUCKS 5.00"]), AccountType::Debit, None)
            .unwrap_err();
        assert_eq!(err.reason, ParseFailureReason::UnrecognizedDate);
    }

    #[test]
    fn test_empty_description_is_failure() {
        let err = parser().parse(&group(&["2024-03-05 -5.00"]), AccountType::Debit, None).unwrap_err();
        assert_eq!(err.reason, ParseFailureReason::EmptyDescription);
    }

    #[test]
    fn test_zero_amount_is_skipped() {
        let parsed = parser().parse(&group(&["2024-03-05 FEE WAIVED 0.00"]), AccountType::Debit, None);
        assert_eq!(parsed, Ok(None));
    }

    #[test]
    fn test_direction_depends_on_account_type() {
        let g = group(&["2024-03-05 REFUND STORE (12.00)"]);
        let debit = parser().parse(&g, AccountType::Debit, None).unwrap().unwrap();
        let credit = parser().parse(&g, AccountType::Credit, None).unwrap().unwrap();
        assert_eq!(debit.direction, Direction::Debit);
        assert_eq!(credit.direction, Direction::Credit);
        assert_eq!(credit.amount, Decimal::new(1200, 2));
    }

    #[test]
    fn test_statement_parser_counts() {
        let p = StatementParser::new(&generic::LAYOUT).unwrap();
        let out = p.parse(
            &["2024-03-05 COFFEE -4.00\n2024-03-06 WAIVED 0.00\n2024-13-01 BAD 1.00", ""],
            AccountType::Debit,
            None,
        );
        assert_eq!(out.groups, 3);
        assert_eq!(out.transactions.len(), 1);
        assert_eq!(out.zero_amount, 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.empty_pages.len(), 1);
    }
}
