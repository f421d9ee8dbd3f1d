//! Date ranges, period bucketing and relative-period resolution.
//!
//! Everything here is pure: "now" is always passed in.

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RangeError;

/// Half-open interval `[start, end)` of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if start >= end {
            return Err(RangeError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = start_of_month(date);
        Self { start, end: add_months(start, 1) }
    }

    /// The interval of equal length immediately before this one.
    ///
    /// Month-aligned ranges shift by whole months so "this month" is
    /// compared with the full previous month.
    pub fn preceding(&self) -> Self {
        if self.start.day() == 1 && self.end.day() == 1 {
            let months = months_between(self.start, self.end);
            if months > 0 {
                return Self {
                    start: sub_months(self.start, months),
                    end: self.start,
                };
            }
        }
        Self {
            start: self.start - Duration::days(self.days()),
            end: self.start,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Bucket size for time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    /// Monday-based weeks
    Week,
    #[default]
    Month,
}

impl Granularity {
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => start_of_week(date),
            Granularity::Month => start_of_month(date),
        }
    }

    /// Start of the bucket after the one starting at `period_start`.
    pub fn next(&self, period_start: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => period_start.checked_add_signed(Duration::days(1)).unwrap_or(NaiveDate::MAX),
            Granularity::Week => period_start.checked_add_signed(Duration::days(7)).unwrap_or(NaiveDate::MAX),
            Granularity::Month => add_months(period_start, 1),
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn start_of_quarter(date: NaiveDate) -> NaiveDate {
    let first_month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), first_month, 1).unwrap_or(date)
}

fn start_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

fn add_months(date: NaiveDate, n: u32) -> NaiveDate {
    date.checked_add_months(Months::new(n)).unwrap_or(NaiveDate::MAX)
}

fn sub_months(date: NaiveDate, n: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(n)).unwrap_or(NaiveDate::MIN)
}

fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    months.max(0) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

fn unit(word: &str) -> Option<Unit> {
    match word {
        "day" | "days" => Some(Unit::Day),
        "week" | "weeks" => Some(Unit::Week),
        "month" | "months" => Some(Unit::Month),
        "quarter" | "quarters" => Some(Unit::Quarter),
        "year" | "years" => Some(Unit::Year),
        _ => None,
    }
}

fn count(word: &str) -> Option<u32> {
    let n = match word {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        other => other.parse().ok()?,
    };
    (1..=1200).contains(&n).then_some(n)
}

// Calendar period containing `now`, or `back` periods before it.
fn calendar(unit: Unit, now: NaiveDate, back: u32) -> DateRange {
    let (start, step_months, step_days) = match unit {
        Unit::Day => (now, 0, 1),
        Unit::Week => (start_of_week(now), 0, 7),
        Unit::Month => (start_of_month(now), 1, 0),
        Unit::Quarter => (start_of_quarter(now), 3, 0),
        Unit::Year => (start_of_year(now), 12, 0),
    };
    if step_months > 0 {
        let start = sub_months(start, step_months * back);
        DateRange { start, end: add_months(start, step_months) }
    } else {
        let start = start - Duration::days(step_days * back as i64);
        DateRange { start, end: start + Duration::days(step_days) }
    }
}

// Window of `n` units ending after today.
fn rolling(unit: Unit, n: u32, now: NaiveDate) -> DateRange {
    let end = now + Duration::days(1);
    let start = match unit {
        Unit::Day => end - Duration::days(n as i64),
        Unit::Week => end - Duration::days(7 * n as i64),
        Unit::Month => sub_months(end, n),
        Unit::Quarter => sub_months(end, 3 * n),
        Unit::Year => sub_months(end, 12 * n),
    };
    DateRange { start, end }
}

fn words(phrase: &str) -> Vec<String> {
    phrase
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn year_month(token: &str) -> Option<DateRange> {
    let token = token.trim_matches(|c: char| !c.is_ascii_digit());
    if token.len() != 7 {
        return None;
    }
    let date = NaiveDate::parse_from_str(&format!("{token}-01"), "%Y-%m-%d").ok()?;
    Some(DateRange::month_of(date))
}

// Match a relative phrase at the start of `w`; returns the range and the
// number of words consumed.
fn match_words(w: &[String], now: NaiveDate) -> Option<(DateRange, usize)> {
    let first = w.first()?.as_str();
    let second = w.get(1).map(String::as_str);
    let third = w.get(2).map(String::as_str);

    match (first, second, third) {
        ("year", Some("to"), Some("date")) => {
            let start = start_of_year(now);
            return Some((DateRange { start, end: now + Duration::days(1) }, 3));
        }
        ("last" | "past" | "previous" | "prior", Some(n), Some(u)) => {
            if let (Some(n), Some(u)) = (count(n), unit(u)) {
                return Some((rolling(u, n, now), 3));
            }
        }
        _ => {}
    }

    match (first, second) {
        ("this" | "current", Some(u)) => {
            if let Some(u) = unit(u) {
                return Some((calendar(u, now, 0), 2));
            }
        }
        ("last" | "past" | "previous" | "prior", Some(u)) => {
            if let Some(u) = unit(u) {
                return Some((calendar(u, now, 1), 2));
            }
        }
        _ => {}
    }

    match first {
        "today" => Some((calendar(Unit::Day, now, 0), 1)),
        "yesterday" => Some((calendar(Unit::Day, now, 1), 1)),
        "ytd" => {
            let start = start_of_year(now);
            Some((DateRange { start, end: now + Duration::days(1) }, 1))
        }
        _ => None,
    }
}

/// Resolve a whole phrase such as `last month`, `last_6_months` or `2024-03`.
pub fn resolve_relative(phrase: &str, now: NaiveDate) -> Option<DateRange> {
    let trimmed = phrase.trim();
    if let Some(range) = year_month(trimmed) {
        return Some(range);
    }
    let w = words(&trimmed.replace('_', " "));
    match match_words(&w, now) {
        Some((range, used)) if used == w.len() => Some(range),
        _ => None,
    }
}

/// Find the first relative period mentioned anywhere in free text.
pub fn find_relative_period(text: &str, now: NaiveDate) -> Option<DateRange> {
    for token in text.split_whitespace() {
        if let Some(range) = year_month(token) {
            return Some(range);
        }
    }
    let w = words(&text.replace('_', " "));
    (0..w.len()).find_map(|i| match_words(&w[i..], now).map(|(range, _)| range))
}
