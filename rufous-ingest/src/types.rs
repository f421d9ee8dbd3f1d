use rufous_core::ExtractionInputError;
use serde::{Deserialize, Serialize};

/// A run of consecutive lines believed to be one transaction: a date-prefixed
/// row plus any continuation lines under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateGroup {
    /// 1-based page number
    pub page: usize,
    /// 1-based line number of the date-prefixed row within its page
    pub line: usize,
    pub lines: Vec<String>,
}

impl CandidateGroup {
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

/// Tokenizer output for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedStatement {
    pub groups: Vec<CandidateGroup>,
    pub empty_pages: Vec<ExtractionInputError>,
    /// Pages with text but no transaction rows (cover pages, summaries).
    pub warnings: Vec<String>,
}
