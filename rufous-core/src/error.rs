//! Error and outcome taxonomy shared across the pipeline.
//!
//! Only [`RangeError`] is ever propagated. The others describe a unit of
//! work (a page, a line group, a question) that was skipped and counted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("date range [{start}, {end}) is empty")]
    Empty { start: NaiveDate, end: NaiveDate },
}

/// A page with no extractable text. The page is skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("page {page} has no extractable text")]
pub struct ExtractionInputError {
    pub page: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailureReason {
    /// Leading token is not in the layout's date formats
    UnrecognizedDate,
    /// No trailing monetary amount
    MissingAmount,
    /// Date and amount found but nothing in between
    EmptyDescription,
    /// Year-less date needs a statement year that was not provided
    MissingYear,
}

impl ParseFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseFailureReason::UnrecognizedDate => "unrecognized date",
            ParseFailureReason::MissingAmount => "missing amount",
            ParseFailureReason::EmptyDescription => "empty description",
            ParseFailureReason::MissingYear => "missing statement year",
        }
    }
}

/// A candidate line group that did not fit the layout. Counted, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("page {page} line {line}: {} ({text:?})", .reason.as_str())]
pub struct ParseFailure {
    pub page: usize,
    pub line: usize,
    pub text: String,
    pub reason: ParseFailureReason,
}

/// A question that could not be mapped onto a known intent.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("could not understand the question: {reason}")]
pub struct UnrecognizedIntent {
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_display() {
        let failure = ParseFailure {
            page: 2,
            line: 14,
            text: "04/31 BAD DATE 5.00".to_string(),
            reason: ParseFailureReason::UnrecognizedDate,
        };
        assert_eq!(
            failure.to_string(),
            "page 2 line 14: unrecognized date (\"04/31 BAD DATE 5.00\")"
        );
    }

    #[test]
    fn test_extraction_error_display() {
        assert_eq!(ExtractionInputError { page: 3 }.to_string(), "page 3 has no extractable text");
    }
}
