//! Statement tokenizer: page text in, candidate line groups out.

use regex::Regex;
use rufous_core::ExtractionInputError;
use tracing::{debug, warn};

use crate::layout::StatementLayout;
use crate::types::{CandidateGroup, TokenizedStatement};

/// Lines dropped for every layout.
const COMMON_BOILERPLATE: [&str; 5] = [
    r"(?i)^\s*page\s+\d+(\s+of\s+\d+)?\s*$",
    r"^\s*\d+\s*/\s*\d+\s*$",
    r"(?i)^\s*\(?continued\s+on\s+(the\s+)?next\s+page\)?\s*$",
    r"(?i)^\s*(opening|closing|previous|new|beginning|ending)\s+balance\b",
    r"(?i)^\s*(trans(action)?\.?\s+)?date\s+(post(ing)?\.?\s+date\s+)?description\b",
];

/// Split extracted text into pages on form feeds. A trailing form feed does
/// not produce an extra page.
pub fn split_pages(text: &str) -> Vec<&str> {
    let mut pages: Vec<&str> = text.split('\x0c').collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    date_prefix: Regex,
    section_start: Option<Regex>,
    section_end: Option<Regex>,
    boilerplate: Vec<Regex>,
}

impl Tokenizer {
    pub fn new(layout: &StatementLayout) -> Result<Self, regex::Error> {
        let boilerplate = COMMON_BOILERPLATE
            .iter()
            .chain(layout.boilerplate)
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            date_prefix: Regex::new(layout.date_prefix)?,
            section_start: layout.section_start.map(Regex::new).transpose()?,
            section_end: layout.section_end.map(Regex::new).transpose()?,
            boilerplate,
        })
    }

    pub fn starts_row(&self, line: &str) -> bool {
        self.date_prefix.is_match(line)
    }

    /// Group the lines of every page. Section state carries across pages so a
    /// transaction table that spans a page break keeps being read.
    pub fn tokenize<S: AsRef<str>>(&self, pages: &[S]) -> TokenizedStatement {
        let mut out = TokenizedStatement::default();
        let mut in_section = self.section_start.is_none();

        for (idx, page) in pages.iter().enumerate() {
            let page_no = idx + 1;
            let text = page.as_ref();
            if text.trim().is_empty() {
                warn!(page = page_no, "page has no extractable text; skipping");
                out.empty_pages.push(ExtractionInputError { page: page_no });
                continue;
            }

            let before = out.groups.len();
            let mut current: Option<CandidateGroup> = None;

            for (line_idx, raw) in text.lines().enumerate() {
                let line = raw.trim();
                if line.is_empty() {
                    continue;
                }

                if let Some(start) = &self.section_start {
                    if start.is_match(line) {
                        out.groups.extend(current.take());
                        in_section = true;
                        continue;
                    }
                    if !in_section {
                        continue;
                    }
                }

                if self.section_end.as_ref().is_some_and(|end| end.is_match(line)) {
                    out.groups.extend(current.take());
                    if self.section_start.is_some() {
                        in_section = false;
                    }
                    continue;
                }

                if self.boilerplate.iter().any(|re| re.is_match(line)) {
                    continue;
                }

                if self.starts_row(line) {
                    out.groups.extend(current.replace(CandidateGroup {
                        page: page_no,
                        line: line_idx + 1,
                        lines: vec![line.to_string()],
                    }));
                } else if let Some(group) = current.as_mut() {
                    group.lines.push(line.to_string());
                } else {
                    debug!(page = page_no, line = line_idx + 1, "text before first row ignored");
                }
            }
            out.groups.extend(current.take());

            if out.groups.len() == before {
                warn!(page = page_no, "no candidate transaction rows on page");
                out.warnings.push(format!("page {page_no}: no transaction rows found"));
            }
        }

        out
    }
}
