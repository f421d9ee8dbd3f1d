//! Read path: [`QueryIntent`] → one store query → [`QueryResult`].
//!
//! Spending values are positive magnitudes of debits with card payments and
//! transfers left out. Result sizes are always capped.

use chrono::NaiveDate;
use rufous_core::{DateRange, Granularity, Transaction, UnrecognizedIntent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::intent::QueryIntent;
use crate::ledger::{AggregateRow, GroupBy, LedgerError, LedgerStore, SortOrder, TransactionFilter};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    UnrecognizedIntent(#[from] UnrecognizedIntent),
    #[error(transparent)]
    Store(#[from] LedgerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// N for TOP_N intents that do not name one
    pub default_top_n: usize,
    pub max_top_n: usize,
    /// Cap on breakdown rows and listed transactions
    pub max_rows: usize,
    /// Cap on time-series points; the most recent are kept
    pub max_series_points: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { default_top_n: 5, max_top_n: 25, max_rows: 100, max_series_points: 366 }
    }
}

impl ExecutorConfig {
    pub fn top_n(&self, requested: Option<usize>) -> usize {
        let max = self.max_top_n.max(1);
        requested.unwrap_or(self.default_top_n).clamp(1, max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub value: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub period_start: NaiveDate,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodTotal {
    pub range: DateRange,
    pub value: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResult {
    Scalar {
        value: Decimal,
        count: usize,
    },
    Breakdown {
        rows: Vec<GroupTotal>,
    },
    Series {
        points: Vec<SeriesPoint>,
    },
    Comparison {
        current: PeriodTotal,
        previous: PeriodTotal,
        change: Decimal,
        /// `None` when the previous period had no spending.
        change_pct: Option<Decimal>,
    },
    Transactions {
        rows: Vec<Transaction>,
    },
}

impl QueryResult {
    /// True for the zero/empty shape returned when nothing matched.
    pub fn is_empty(&self) -> bool {
        match self {
            QueryResult::Scalar { count, .. } => *count == 0,
            QueryResult::Breakdown { rows } => rows.is_empty(),
            QueryResult::Series { points } => points.iter().all(|p| p.value.is_zero()),
            QueryResult::Comparison { current, previous, .. } => current.count == 0 && previous.count == 0,
            QueryResult::Transactions { rows } => rows.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryExecutor {
    config: ExecutorConfig,
}

fn spending(range: Option<DateRange>, category: Option<&String>) -> TransactionFilter {
    TransactionFilter {
        range,
        category: category.cloned(),
        ..TransactionFilter::spending()
    }
}

fn total(rows: &BTreeMap<String, AggregateRow>) -> (Decimal, usize) {
    rows.values().fold((Decimal::ZERO, 0), |(sum, count), r| (sum - r.sum, count + r.count))
}

impl QueryExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn execute(&self, intent: &QueryIntent, store: &dyn LedgerStore) -> Result<QueryResult, QueryError> {
        debug!(kind = ?intent.kind(), "executing query");
        let cfg = &self.config;
        let result = match intent {
            QueryIntent::TotalByCategory { range, category: Some(c) } => {
                let (value, count) = total(&store.aggregate(GroupBy::Category, &spending(*range, Some(c)))?);
                QueryResult::Scalar { value, count }
            }
            QueryIntent::TotalByCategory { range, category: None } => {
                let rows = store.aggregate(GroupBy::Category, &spending(*range, None))?;
                self.breakdown(rows, cfg.max_rows)
            }
            QueryIntent::TotalByMerchant { range, merchant: Some(m) } => {
                let filter = TransactionFilter { merchant: Some(m.clone()), ..spending(*range, None) };
                let (value, count) = total(&store.aggregate(GroupBy::Merchant, &filter)?);
                QueryResult::Scalar { value, count }
            }
            QueryIntent::TotalByMerchant { range, merchant: None } => {
                let rows = store.aggregate(GroupBy::Merchant, &spending(*range, None))?;
                self.breakdown(rows, cfg.max_rows)
            }
            QueryIntent::TotalOverPeriod { range, category } => {
                let (value, count) =
                    total(&store.aggregate(GroupBy::Category, &spending(Some(*range), category.as_ref()))?);
                QueryResult::Scalar { value, count }
            }
            QueryIntent::TrendOverTime { range, granularity, category } => {
                let rows = store.aggregate(GroupBy::Period(*granularity), &spending(*range, category.as_ref()))?;
                let values: BTreeMap<NaiveDate, Decimal> = rows
                    .iter()
                    .filter_map(|(key, row)| Some((key.parse().ok()?, -row.sum)))
                    .collect();
                let bounds = self.bounds(&values, *range, *granularity);
                QueryResult::Series { points: self.fill_series(&values, bounds, *granularity) }
            }
            QueryIntent::ComparePeriods { current, previous, category } => {
                self.compare(*current, *previous, category.as_ref(), store)?
            }
            QueryIntent::TopNCategories { range, n } => {
                let rows = store.aggregate(GroupBy::Category, &spending(*range, None))?;
                self.breakdown(rows, cfg.top_n(*n))
            }
            QueryIntent::TopNMerchants { range, n, category } => {
                let rows = store.aggregate(GroupBy::Merchant, &spending(*range, category.as_ref()))?;
                self.breakdown(rows, cfg.top_n(*n))
            }
            QueryIntent::TransactionsAboveThreshold { range, threshold } => {
                let filter = TransactionFilter {
                    above: Some(*threshold),
                    order: SortOrder::LargestFirst,
                    limit: Some(cfg.max_rows),
                    ..spending(*range, None)
                };
                QueryResult::Transactions { rows: store.query(&filter)? }
            }
            QueryIntent::BalanceTrend { range, granularity } => self.balance_trend(*range, *granularity, store)?,
            QueryIntent::AveragePerDay { range, category } => {
                let (sum, count) =
                    total(&store.aggregate(GroupBy::Category, &spending(Some(*range), category.as_ref()))?);
                let value = (sum / Decimal::from(range.days().max(1))).round_dp(2);
                QueryResult::Scalar { value, count }
            }
            QueryIntent::Unrecognized { reason } => {
                return Err(UnrecognizedIntent { reason: reason.clone() }.into());
            }
        };
        Ok(result)
    }

    /// Spending per key, largest first, ties by key.
    fn breakdown(&self, rows: BTreeMap<String, AggregateRow>, cap: usize) -> QueryResult {
        let mut rows: Vec<GroupTotal> = rows
            .into_iter()
            .map(|(key, row)| GroupTotal { key, value: -row.sum, count: row.count })
            .collect();
        rows.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
        rows.truncate(cap);
        QueryResult::Breakdown { rows }
    }

    /// First and end bucket bounds of a series: the range when bounded,
    /// otherwise the buckets that have data. At most `max_series_points`
    /// buckets fit between them; the latest ones are kept.
    fn bounds(
        &self,
        values: &BTreeMap<NaiveDate, Decimal>,
        range: Option<DateRange>,
        granularity: Granularity,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let (first, end) = match range {
            Some(r) => (granularity.period_start(r.start), r.end),
            None => (*values.keys().next()?, granularity.next(*values.keys().next_back()?)),
        };
        let Some(last_day) = end.pred_opt() else { return Some((first, end)) };

        let mut kept = granularity.period_start(last_day);
        for _ in 1..self.config.max_series_points.max(1) {
            if kept <= first {
                break;
            }
            match kept.pred_opt() {
                Some(day) => kept = granularity.period_start(day),
                None => break,
            }
        }
        Some((kept.max(first), end))
    }

    /// One point per bucket within `bounds`, zero where nothing happened.
    fn fill_series(
        &self,
        values: &BTreeMap<NaiveDate, Decimal>,
        bounds: Option<(NaiveDate, NaiveDate)>,
        granularity: Granularity,
    ) -> Vec<SeriesPoint> {
        let Some((first, end)) = bounds else { return Vec::new() };
        let mut points = Vec::new();
        let mut bucket = first;
        while bucket < end {
            points.push(SeriesPoint {
                period_start: bucket,
                value: values.get(&bucket).copied().unwrap_or(Decimal::ZERO),
            });
            let next = granularity.next(bucket);
            if next <= bucket {
                break;
            }
            bucket = next;
        }
        points
    }

    fn compare(
        &self,
        current: DateRange,
        previous: DateRange,
        category: Option<&String>,
        store: &dyn LedgerStore,
    ) -> Result<QueryResult, QueryError> {
        let span = DateRange {
            start: current.start.min(previous.start),
            end: current.end.max(previous.end),
        };
        let days = store.aggregate(GroupBy::Period(Granularity::Day), &spending(Some(span), category))?;

        let period_total = |range: DateRange| {
            let (value, count) = days
                .iter()
                .filter(|(key, _)| key.parse::<NaiveDate>().is_ok_and(|d| range.contains(d)))
                .fold((Decimal::ZERO, 0), |(sum, count), (_, r)| (sum - r.sum, count + r.count));
            PeriodTotal { range, value, count }
        };
        let current = period_total(current);
        let previous = period_total(previous);
        let change = current.value - previous.value;
        let change_pct = (!previous.value.is_zero())
            .then(|| (change / previous.value * Decimal::ONE_HUNDRED).round_dp(1));

        Ok(QueryResult::Comparison { current, previous, change, change_pct })
    }

    /// Running signed balance at the end of each bucket. The opening balance
    /// is the net of everything before the first bucket shown.
    fn balance_trend(
        &self,
        range: Option<DateRange>,
        granularity: Granularity,
        store: &dyn LedgerStore,
    ) -> Result<QueryResult, QueryError> {
        let filter = TransactionFilter {
            range: range.map(|r| DateRange { start: NaiveDate::MIN, end: r.end }),
            ..Default::default()
        };
        let rows = store.aggregate(GroupBy::Period(Granularity::Day), &filter)?;
        let mut net: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for (key, row) in &rows {
            let Ok(day) = key.parse::<NaiveDate>() else { continue };
            *net.entry(granularity.period_start(day)).or_default() += row.sum;
        }

        // Buckets before the first one shown fold into the opening balance.
        let bounds = self.bounds(&net, range, granularity);
        let opening: Decimal = match bounds {
            Some((first, _)) => net.range(..first).map(|(_, v)| *v).sum(),
            None => Decimal::ZERO,
        };

        let mut running = opening;
        let points = self
            .fill_series(&net, bounds, granularity)
            .into_iter()
            .map(|p| {
                running += p.value;
                SeriesPoint { period_start: p.period_start, value: running }
            })
            .collect();
        Ok(QueryResult::Series { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::ledger::fixtures::{statement, txn};
    use rufous_core::StatementId;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    fn march() -> DateRange {
        range(d(2024, 3, 1), d(2024, 4, 1))
    }

    fn ledger() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        let s: StatementId = ledger.register_statement(statement()).unwrap().id;
        for t in [
            txn(s, (2024, 2, 10), "PAYROLL ACME", 300000, "Uncategorized"),
            txn(s, (2024, 2, 12), "LOBLAWS #12", -8000, "Food & Dining"),
            txn(s, (2024, 3, 5), "STARBUCKS #1234", -575, "Food & Dining"),
            txn(s, (2024, 3, 6), "STARBUCKS #0042", -625, "Food & Dining"),
            txn(s, (2024, 3, 9), "UBER TRIP", -1850, "Transportation"),
            txn(s, (2024, 3, 20), "BEST BUY #77", -24999, "Shopping"),
            txn(s, (2024, 3, 25), "PAYMENT THANK YOU", -50000, "Transfers"),
            txn(s, (2024, 3, 28), "REFUND UBER", 1000, "Transportation"),
        ] {
            ledger.insert_if_absent(t).unwrap();
        }
        ledger
    }

    fn run(intent: QueryIntent) -> QueryResult {
        QueryExecutor::default().execute(&intent, &ledger()).unwrap()
    }

    #[test]
    fn test_category_total_is_positive_spending() {
        let result = run(QueryIntent::TotalByCategory {
            range: Some(march()),
            category: Some("Food & Dining".into()),
        });
        assert_eq!(result, QueryResult::Scalar { value: Decimal::new(1200, 2), count: 2 });
    }

    #[test]
    fn test_breakdown_excludes_transfers_and_income() {
        let QueryResult::Breakdown { rows } = run(QueryIntent::TotalByCategory { range: Some(march()), category: None })
        else {
            panic!("expected breakdown")
        };
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["Shopping", "Transportation", "Food & Dining"]);
        assert_eq!(rows[1].value, Decimal::new(1850, 2));
    }

    #[test]
    fn test_top_n_is_capped() {
        let QueryResult::Breakdown { rows } = run(QueryIntent::TopNMerchants { range: None, n: Some(1000), category: None })
        else {
            panic!("expected breakdown")
        };
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].key, "BEST BUY");

        let QueryResult::Breakdown { rows } = run(QueryIntent::TopNCategories { range: None, n: Some(2) }) else {
            panic!("expected breakdown")
        };
        assert_eq!(rows.len(), 2);

        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.top_n(None), 5);
        assert_eq!(cfg.top_n(Some(0)), 1);
        assert_eq!(cfg.top_n(Some(1000)), 25);
    }

    #[test]
    fn test_merchant_total() {
        let result = run(QueryIntent::TotalByMerchant { range: None, merchant: Some("starbucks".into()) });
        assert_eq!(result, QueryResult::Scalar { value: Decimal::new(1200, 2), count: 2 });
    }

    #[test]
    fn test_trend_fills_gaps() {
        let QueryResult::Series { points } = run(QueryIntent::TrendOverTime {
            range: Some(range(d(2024, 1, 1), d(2024, 4, 1))),
            granularity: Granularity::Month,
            category: None,
        }) else {
            panic!("expected series")
        };
        let values: Vec<_> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Decimal::ZERO, Decimal::new(8000, 2), Decimal::new(28049, 2)]);
        assert_eq!(points[0].period_start, d(2024, 1, 1));
    }

    #[test]
    fn test_compare_periods() {
        let result = run(QueryIntent::ComparePeriods {
            current: march(),
            previous: range(d(2024, 2, 1), d(2024, 3, 1)),
            category: None,
        });
        let QueryResult::Comparison { current, previous, change, change_pct } = result else {
            panic!("expected comparison")
        };
        assert_eq!(current.value, Decimal::new(28049, 2));
        assert_eq!(previous.value, Decimal::new(8000, 2));
        assert_eq!(change, Decimal::new(20049, 2));
        assert_eq!(change_pct, Some(Decimal::new(2506, 1)));
    }

    #[test]
    fn test_threshold_lists_largest_first() {
        let QueryResult::Transactions { rows } = run(QueryIntent::TransactionsAboveThreshold {
            range: None,
            threshold: Decimal::new(10, 0),
        }) else {
            panic!("expected transactions")
        };
        let merchants: Vec<_> = rows.iter().map(|t| t.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["BEST BUY", "LOBLAWS", "UBER TRIP"]);
    }

    #[test]
    fn test_balance_trend_carries_opening_balance() {
        let QueryResult::Series { points } =
            run(QueryIntent::BalanceTrend { range: Some(march()), granularity: Granularity::Month })
        else {
            panic!("expected series")
        };
        // Opening 3000.00 - 80.00, then March net -770.49 (transfers count here).
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, Decimal::new(214951, 2));
    }

    #[test]
    fn test_series_over_huge_range_stays_capped() {
        let exec = QueryExecutor::new(ExecutorConfig { max_series_points: 3, ..Default::default() });
        let intent = QueryIntent::TrendOverTime {
            range: Some(range(d(1, 1, 1), d(9999, 12, 31))),
            granularity: Granularity::Day,
            category: None,
        };
        let QueryResult::Series { points } = exec.execute(&intent, &MemoryLedger::new()).unwrap() else {
            panic!("expected series")
        };
        let starts: Vec<_> = points.iter().map(|p| p.period_start).collect();
        assert_eq!(starts, vec![d(9999, 12, 28), d(9999, 12, 29), d(9999, 12, 30)]);
    }

    #[test]
    fn test_capped_balance_trend_folds_hidden_buckets_into_opening() {
        let exec = QueryExecutor::new(ExecutorConfig { max_series_points: 1, ..Default::default() });
        let intent = QueryIntent::BalanceTrend {
            range: Some(range(d(2024, 1, 1), d(2024, 4, 1))),
            granularity: Granularity::Month,
        };
        let QueryResult::Series { points } = exec.execute(&intent, &ledger()).unwrap() else {
            panic!("expected series")
        };
        assert_eq!(points, vec![SeriesPoint { period_start: d(2024, 3, 1), value: Decimal::new(214951, 2) }]);
    }

    #[test]
    fn test_average_per_day() {
        let result = run(QueryIntent::AveragePerDay { range: march(), category: None });
        assert_eq!(result, QueryResult::Scalar { value: Decimal::new(905, 2), count: 4 });
    }

    #[test]
    fn test_empty_ledger_gives_empty_results() {
        let empty = MemoryLedger::new();
        let exec = QueryExecutor::default();
        let breakdown = exec
            .execute(&QueryIntent::TotalByCategory { range: None, category: None }, &empty)
            .unwrap();
        assert_eq!(breakdown, QueryResult::Breakdown { rows: vec![] });

        let total = exec
            .execute(&QueryIntent::TotalOverPeriod { range: march(), category: None }, &empty)
            .unwrap();
        assert_eq!(total, QueryResult::Scalar { value: Decimal::ZERO, count: 0 });
        assert!(total.is_empty());
    }

    #[test]
    fn test_unrecognized_intent_is_an_error() {
        let err = QueryExecutor::default()
            .execute(&QueryIntent::unrecognized("no idea"), &ledger())
            .unwrap_err();
        assert!(matches!(err, QueryError::UnrecognizedIntent(_)));
    }
}
