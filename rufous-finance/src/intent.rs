//! The closed set of questions the executor can answer.

use rufous_core::{DateRange, Granularity};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    TotalByCategory,
    TotalByMerchant,
    TotalOverPeriod,
    TrendOverTime,
    ComparePeriods,
    TopNCategories,
    TopNMerchants,
    TransactionsAboveThreshold,
    BalanceTrend,
    AveragePerDay,
}

impl IntentKind {
    pub const ALL: [IntentKind; 10] = [
        IntentKind::TotalByCategory,
        IntentKind::TotalByMerchant,
        IntentKind::TotalOverPeriod,
        IntentKind::TrendOverTime,
        IntentKind::ComparePeriods,
        IntentKind::TopNCategories,
        IntentKind::TopNMerchants,
        IntentKind::TransactionsAboveThreshold,
        IntentKind::BalanceTrend,
        IntentKind::AveragePerDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::TotalByCategory => "TOTAL_BY_CATEGORY",
            IntentKind::TotalByMerchant => "TOTAL_BY_MERCHANT",
            IntentKind::TotalOverPeriod => "TOTAL_OVER_PERIOD",
            IntentKind::TrendOverTime => "TREND_OVER_TIME",
            IntentKind::ComparePeriods => "COMPARE_PERIODS",
            IntentKind::TopNCategories => "TOP_N_CATEGORIES",
            IntentKind::TopNMerchants => "TOP_N_MERCHANTS",
            IntentKind::TransactionsAboveThreshold => "TRANSACTIONS_ABOVE_THRESHOLD",
            IntentKind::BalanceTrend => "BALANCE_TREND",
            IntentKind::AveragePerDay => "AVERAGE_PER_DAY",
        }
    }

    /// One-line description used in the model prompt.
    pub fn describe(&self) -> &'static str {
        match self {
            IntentKind::TotalByCategory => "spending per category, or for one category",
            IntentKind::TotalByMerchant => "spending per merchant, or at one merchant",
            IntentKind::TotalOverPeriod => "total spending in a period (needs a period)",
            IntentKind::TrendOverTime => "spending per day/week/month",
            IntentKind::ComparePeriods => "spending in one period against another (needs a period)",
            IntentKind::TopNCategories => "the N categories with the most spending",
            IntentKind::TopNMerchants => "the N merchants with the most spending",
            IntentKind::TransactionsAboveThreshold => "purchases larger than an amount (needs threshold)",
            IntentKind::BalanceTrend => "running account balance over time",
            IntentKind::AveragePerDay => "average daily spending in a period (needs a period)",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `TOP_N_MERCHANTS`, `top_n_merchants` and `top-n-merchants`.
impl FromStr for IntentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', ' '], "_").to_uppercase();
        IntentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("unknown intent {s:?}"))
    }
}

/// A resolved question with its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryIntent {
    TotalByCategory {
        range: Option<DateRange>,
        category: Option<String>,
    },
    TotalByMerchant {
        range: Option<DateRange>,
        merchant: Option<String>,
    },
    TotalOverPeriod {
        range: DateRange,
        category: Option<String>,
    },
    TrendOverTime {
        range: Option<DateRange>,
        granularity: Granularity,
        category: Option<String>,
    },
    ComparePeriods {
        current: DateRange,
        previous: DateRange,
        category: Option<String>,
    },
    TopNCategories {
        range: Option<DateRange>,
        n: Option<usize>,
    },
    TopNMerchants {
        range: Option<DateRange>,
        n: Option<usize>,
        category: Option<String>,
    },
    TransactionsAboveThreshold {
        range: Option<DateRange>,
        threshold: Decimal,
    },
    BalanceTrend {
        range: Option<DateRange>,
        granularity: Granularity,
    },
    AveragePerDay {
        range: DateRange,
        category: Option<String>,
    },
    Unrecognized {
        reason: String,
    },
}

impl QueryIntent {
    pub fn unrecognized(reason: impl Into<String>) -> Self {
        QueryIntent::Unrecognized { reason: reason.into() }
    }

    /// `None` for [`QueryIntent::Unrecognized`].
    pub fn kind(&self) -> Option<IntentKind> {
        Some(match self {
            QueryIntent::TotalByCategory { .. } => IntentKind::TotalByCategory,
            QueryIntent::TotalByMerchant { .. } => IntentKind::TotalByMerchant,
            QueryIntent::TotalOverPeriod { .. } => IntentKind::TotalOverPeriod,
            QueryIntent::TrendOverTime { .. } => IntentKind::TrendOverTime,
            QueryIntent::ComparePeriods { .. } => IntentKind::ComparePeriods,
            QueryIntent::TopNCategories { .. } => IntentKind::TopNCategories,
            QueryIntent::TopNMerchants { .. } => IntentKind::TopNMerchants,
            QueryIntent::TransactionsAboveThreshold { .. } => IntentKind::TransactionsAboveThreshold,
            QueryIntent::BalanceTrend { .. } => IntentKind::BalanceTrend,
            QueryIntent::AveragePerDay { .. } => IntentKind::AveragePerDay,
            QueryIntent::Unrecognized { .. } => return None,
        })
    }
}
