//! Natural-language question → [`QueryIntent`].
//!
//! The model completion is untrusted text. It is only ever read as one JSON
//! object with a fixed set of keys; every value is validated and bound to a
//! slot of an enumerated intent. Anything else resolves to
//! [`QueryIntent::Unrecognized`].

use chrono::{Duration, NaiveDate};
use rufous_core::{
    CategorySet, DateRange, Granularity, UnrecognizedIntent, find_relative_period, normalize_description,
    resolve_relative,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::intent::{IntentKind, QueryIntent};

/// Longest completion the resolver will look at.
pub const MAX_COMPLETION_BYTES: usize = 4096;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Completion {
    intent: String,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    compare_period: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    merchant: Option<String>,
    #[serde(default)]
    threshold: Option<Value>,
    #[serde(default)]
    n: Option<Value>,
    #[serde(default)]
    granularity: Option<String>,
}

type Resolved<T> = Result<T, UnrecognizedIntent>;

fn reject<T>(reason: impl Into<String>) -> Resolved<T> {
    Err(UnrecognizedIntent { reason: reason.into() })
}

#[derive(Debug, Clone)]
pub struct IntentResolver {
    categories: CategorySet,
}

impl IntentResolver {
    pub fn new(categories: CategorySet) -> Self {
        Self { categories }
    }

    /// Map a question and the model's completion for it onto an intent.
    /// `now` anchors relative periods.
    pub fn resolve(&self, question: &str, completion: &str, now: NaiveDate) -> QueryIntent {
        match self.try_resolve(question, completion, now) {
            Ok(intent) => {
                debug!(kind = ?intent.kind(), "question resolved");
                intent
            }
            Err(UnrecognizedIntent { reason }) => {
                warn!(%reason, "question not understood");
                QueryIntent::Unrecognized { reason }
            }
        }
    }

    fn try_resolve(&self, question: &str, completion: &str, now: NaiveDate) -> Resolved<QueryIntent> {
        if question.trim().is_empty() {
            return reject("empty question");
        }
        if completion.len() > MAX_COMPLETION_BYTES {
            return reject(format!("completion longer than {MAX_COMPLETION_BYTES} bytes"));
        }
        let Some(json) = json_object(completion) else {
            return reject("completion has no JSON object");
        };
        let c: Completion = match serde_json::from_str(json) {
            Ok(c) => c,
            Err(e) => return reject(format!("completion does not fit the intent schema: {e}")),
        };

        if c.intent.trim().eq_ignore_ascii_case("UNRECOGNIZED") {
            return reject("model could not map the question");
        }
        let Ok(kind) = IntentKind::from_str(&c.intent) else {
            return reject(format!("unknown intent {:?}", c.intent));
        };

        let range = self.range(&c, question, now)?;
        let category = self.category(c.category.as_deref())?;
        let granularity = match c.granularity.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            Some(g) => match Granularity::from_str(g) {
                Ok(g) => g,
                Err(e) => return reject(e),
            },
            None => Granularity::default(),
        };
        let n = top_n(c.n.as_ref())?;
        let merchant = merchant_slot(c.merchant.as_deref())?;

        let needs_range = |range: Option<DateRange>| match range {
            Some(r) => Ok(r),
            None => reject(format!("{kind} needs a period")),
        };

        Ok(match kind {
            IntentKind::TotalByCategory => QueryIntent::TotalByCategory { range, category },
            IntentKind::TotalByMerchant => QueryIntent::TotalByMerchant { range, merchant },
            IntentKind::TotalOverPeriod => QueryIntent::TotalOverPeriod { range: needs_range(range)?, category },
            IntentKind::TrendOverTime => QueryIntent::TrendOverTime { range, granularity, category },
            IntentKind::ComparePeriods => {
                let current = needs_range(range)?;
                let previous = match c.compare_period.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                    Some(p) => match resolve_relative(p, now) {
                        Some(r) => r,
                        None => return reject(format!("unknown comparison period {p:?}")),
                    },
                    None => current.preceding(),
                };
                QueryIntent::ComparePeriods { current, previous, category }
            }
            IntentKind::TopNCategories => QueryIntent::TopNCategories { range, n },
            IntentKind::TopNMerchants => QueryIntent::TopNMerchants { range, n, category },
            IntentKind::TransactionsAboveThreshold => {
                let Some(threshold) = threshold(c.threshold.as_ref())? else {
                    return reject("TRANSACTIONS_ABOVE_THRESHOLD needs a threshold");
                };
                QueryIntent::TransactionsAboveThreshold { range, threshold }
            }
            IntentKind::BalanceTrend => QueryIntent::BalanceTrend { range, granularity },
            IntentKind::AveragePerDay => QueryIntent::AveragePerDay { range: needs_range(range)?, category },
        })
    }

    /// Explicit `start`/`end` (end inclusive) win over `period`; without
    /// either, the question itself is scanned for a relative phrase.
    fn range(&self, c: &Completion, question: &str, now: NaiveDate) -> Resolved<Option<DateRange>> {
        let start = c.start.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let end = c.end.as_deref().map(str::trim).filter(|s| !s.is_empty());
        match (start, end) {
            (Some(start), end) => {
                let start = parse_iso(start)?;
                let end = match end {
                    Some(end) => parse_iso(end)? + Duration::days(1),
                    None => now + Duration::days(1),
                };
                match DateRange::new(start, end) {
                    Ok(r) => Ok(Some(r)),
                    Err(e) => reject(e.to_string()),
                }
            }
            (None, Some(_)) => reject("end date without a start date"),
            (None, None) => match c.period.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                Some(period) => match resolve_relative(period, now) {
                    Some(r) => Ok(Some(r)),
                    None => reject(format!("unknown period {period:?}")),
                },
                None => Ok(find_relative_period(question, now)),
            },
        }
    }

    fn category(&self, raw: Option<&str>) -> Resolved<Option<String>> {
        match raw.map(str::trim).filter(|c| !c.is_empty()) {
            None => Ok(None),
            Some(label) => match self.categories.canonical_label(label) {
                Some(canonical) => Ok(Some(canonical.to_string())),
                None => reject(format!("unknown category {label:?}")),
            },
        }
    }

    /// Instruction text for the external model. Pure: the same inputs always
    /// give the same prompt.
    pub fn completion_prompt(&self, question: &str, now: NaiveDate) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "You translate questions about a personal bank ledger into JSON.");
        let _ = writeln!(out, "Today is {now}.");
        let _ = writeln!(out);
        let _ = writeln!(out, "Reply with exactly one JSON object and nothing else. Allowed keys:");
        let _ = writeln!(out, "  intent          (required) one of the names below, or \"UNRECOGNIZED\"");
        let _ = writeln!(out, "  period          relative period, e.g. \"last month\", \"this quarter\", \"last 6 months\", \"2024-03\"");
        let _ = writeln!(out, "  start, end      explicit dates YYYY-MM-DD, end inclusive (instead of period)");
        let _ = writeln!(out, "  compare_period  second period for COMPARE_PERIODS (default: the period before)");
        let _ = writeln!(out, "  category        one of the categories below");
        let _ = writeln!(out, "  merchant        merchant name, e.g. \"starbucks\"");
        let _ = writeln!(out, "  threshold       amount for TRANSACTIONS_ABOVE_THRESHOLD, e.g. 100");
        let _ = writeln!(out, "  n               how many rows for TOP_N_* intents");
        let _ = writeln!(out, "  granularity     \"day\", \"week\" or \"month\"");
        let _ = writeln!(out);
        let _ = writeln!(out, "Intents:");
        for kind in IntentKind::ALL {
            let _ = writeln!(out, "  {:<30} {}", kind.as_str(), kind.describe());
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Categories: {}", self.categories.labels().join(", "));
        let _ = writeln!(out);
        let _ = writeln!(out, "Question: {}", question.trim());
        out
    }
}

/// A merchant must keep at least one letter or digit once normalized; an
/// empty needle would match every row.
fn merchant_slot(raw: Option<&str>) -> Resolved<Option<String>> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(None),
        Some(m) if normalize_description(m).is_empty() => reject(format!("merchant {m:?} has no name in it")),
        Some(m) => Ok(Some(m.to_string())),
    }
}

/// First `{` through last `}`.
fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_iso(s: &str) -> Resolved<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").or_else(|_| reject(format!("bad date {s:?}")))
}

fn threshold(raw: Option<&Value>) -> Resolved<Option<Decimal>> {
    let text = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().trim_start_matches('$').replace(',', ""),
        Some(other) => return reject(format!("threshold is not a number: {other}")),
    };
    match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
        Ok(value) if value > Decimal::ZERO => Ok(Some(value)),
        Ok(_) => reject("threshold must be positive"),
        Err(_) => reject(format!("threshold is not a number: {text:?}")),
    }
}

/// Any positive whole number; clamping to the configured maximum is the
/// executor's job.
fn top_n(raw: Option<&Value>) -> Resolved<Option<usize>> {
    let parsed = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(n) if n > 0 => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
        _ => reject("n must be a positive whole number"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    fn resolver() -> IntentResolver {
        IntentResolver::new(CategorySet::builtin())
    }

    fn resolve(question: &str, completion: &str) -> QueryIntent {
        resolver().resolve(question, completion, now())
    }

    fn is_unrecognized(intent: &QueryIntent) -> bool {
        matches!(intent, QueryIntent::Unrecognized { .. })
    }

    #[test]
    fn test_category_total_last_month() {
        let intent = resolve(
            "How much did I spend on food last month?",
            r#"{"intent": "TOTAL_BY_CATEGORY", "category": "food & dining", "period": "last month"}"#,
        );
        assert_eq!(
            intent,
            QueryIntent::TotalByCategory {
                range: Some(range(d(2024, 5, 1), d(2024, 6, 1))),
                category: Some("Food & Dining".to_string()),
            }
        );
    }

    #[test]
    fn test_period_falls_back_to_question_text() {
        let intent = resolve("What did I spend this quarter?", r#"{"intent":"TOTAL_OVER_PERIOD"}"#);
        assert_eq!(
            intent,
            QueryIntent::TotalOverPeriod { range: range(d(2024, 4, 1), d(2024, 7, 1)), category: None }
        );
    }

    #[test]
    fn test_prose_around_json_is_tolerated() {
        let completion = "Sure! Here is the JSON:\n```json\n{\"intent\": \"top_n_merchants\", \"n\": 3}\n```";
        let intent = resolve("Where do I shop most?", completion);
        assert_eq!(intent, QueryIntent::TopNMerchants { range: None, n: Some(3), category: None });
    }

    #[test]
    fn test_explicit_dates_are_end_inclusive() {
        let intent = resolve(
            "Purchases over $100 in March",
            r#"{"intent":"TRANSACTIONS_ABOVE_THRESHOLD","threshold":"$100","start":"2024-03-01","end":"2024-03-31"}"#,
        );
        assert_eq!(
            intent,
            QueryIntent::TransactionsAboveThreshold {
                range: Some(range(d(2024, 3, 1), d(2024, 4, 1))),
                threshold: Decimal::new(100, 0),
            }
        );
    }

    #[test]
    fn test_compare_defaults_to_preceding_period() {
        let intent = resolve(
            "Compare my spending this month vs last month",
            r#"{"intent":"COMPARE_PERIODS","period":"this_month"}"#,
        );
        assert_eq!(
            intent,
            QueryIntent::ComparePeriods {
                current: range(d(2024, 6, 1), d(2024, 7, 1)),
                previous: range(d(2024, 5, 1), d(2024, 6, 1)),
                category: None,
            }
        );
    }

    #[test]
    fn test_trend_granularity_and_explicit_comparison() {
        let trend = resolve(
            "weekly spending over the last 6 months",
            r#"{"intent":"TREND_OVER_TIME","granularity":"weekly","period":"last 6 months"}"#,
        );
        assert!(matches!(trend, QueryIntent::TrendOverTime { granularity: Granularity::Week, range: Some(_), .. }));

        let cmp = resolve(
            "this year against last year",
            r#"{"intent":"COMPARE_PERIODS","period":"this year","compare_period":"last year"}"#,
        );
        let QueryIntent::ComparePeriods { previous, .. } = cmp else { panic!("{cmp:?}") };
        assert_eq!(previous, range(d(2023, 1, 1), d(2024, 1, 1)));
    }

    #[rstest]
    #[case::blank_question("   ", r#"{"intent":"TOTAL_BY_CATEGORY"}"#)]
    #[case::no_json("What's the weather?", "I can only answer questions about your spending.")]
    #[case::malformed("q", r#"{"intent": "TOTAL_BY_CATEGORY""#)]
    #[case::model_gave_up("What's the weather?", r#"{"intent":"UNRECOGNIZED"}"#)]
    #[case::unknown_intent("q", r#"{"intent":"DELETE_ALL"}"#)]
    #[case::unknown_key("q", r#"{"intent":"TOTAL_BY_CATEGORY","sql":"DROP TABLE ledger_transaction"}"#)]
    #[case::unknown_category("q", r#"{"intent":"TOTAL_BY_CATEGORY","category":"Yachts"}"#)]
    #[case::bad_period("q", r#"{"intent":"TOTAL_OVER_PERIOD","period":"the before times"}"#)]
    #[case::missing_period("q", r#"{"intent":"AVERAGE_PER_DAY"}"#)]
    #[case::missing_threshold("q", r#"{"intent":"TRANSACTIONS_ABOVE_THRESHOLD"}"#)]
    #[case::negative_threshold("q", r#"{"intent":"TRANSACTIONS_ABOVE_THRESHOLD","threshold":-5}"#)]
    #[case::zero_n("q", r#"{"intent":"TOP_N_CATEGORIES","n":0}"#)]
    #[case::reversed_dates("q", r#"{"intent":"TOTAL_OVER_PERIOD","start":"2024-03-31","end":"2024-03-01"}"#)]
    #[case::end_only("q", r#"{"intent":"TOTAL_OVER_PERIOD","end":"2024-03-01"}"#)]
    #[case::bad_granularity("q", r#"{"intent":"TREND_OVER_TIME","granularity":"fortnight"}"#)]
    #[case::punctuation_merchant("q", r#"{"intent":"TOTAL_BY_MERCHANT","merchant":"***"}"#)]
    fn test_unrecognized(#[case] question: &str, #[case] completion: &str) {
        assert!(is_unrecognized(&resolve(question, completion)));
    }

    #[test]
    fn test_oversized_completion_is_rejected() {
        let padding = " ".repeat(MAX_COMPLETION_BYTES);
        let completion = format!(r#"{{"intent":"TOTAL_BY_CATEGORY"}}{padding}"#);
        assert!(is_unrecognized(&resolve("q", &completion)));
    }

    #[test]
    fn test_prompt_lists_vocabulary() {
        let prompt = resolver().completion_prompt("How much on coffee?", now());
        assert!(prompt.contains("Today is 2024-06-15."));
        for kind in IntentKind::ALL {
            assert!(prompt.contains(kind.as_str()));
        }
        assert!(prompt.contains("Food & Dining"));
        assert!(prompt.ends_with("Question: How much on coffee?\n"));
        assert_eq!(prompt, resolver().completion_prompt("How much on coffee?", now()));
    }
}
