//! Time range resolution: symbolic selectors to concrete UTC instants.
//!
//! All ranges are computed at UTC day boundaries (00:00:00.000 to
//! 23:59:59.999) so results are stable regardless of server-local timezone and
//! line up with the Admin API's date filtering.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{ReportFlowError, Result};

/// Symbolic date-range selector attached to a schedule's filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateRange {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    Last90Days,
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
    Custom,
}

impl DateRange {
    /// Parse a selector tag. Unknown tags fall back to the 30-day default.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "TODAY" => Self::Today,
            "YESTERDAY" => Self::Yesterday,
            "LAST_7_DAYS" => Self::Last7Days,
            "LAST_30_DAYS" => Self::Last30Days,
            "LAST_90_DAYS" => Self::Last90Days,
            "THIS_MONTH" => Self::ThisMonth,
            "LAST_MONTH" => Self::LastMonth,
            "THIS_QUARTER" => Self::ThisQuarter,
            "LAST_QUARTER" => Self::LastQuarter,
            "THIS_YEAR" => Self::ThisYear,
            "LAST_YEAR" => Self::LastYear,
            "CUSTOM" => Self::Custom,
            _ => Self::Last30Days,
        }
    }

    /// Human-readable label for email display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Yesterday => "Yesterday",
            Self::Last7Days => "Last 7 Days",
            Self::Last30Days => "Last 30 Days",
            Self::Last90Days => "Last 90 Days",
            Self::ThisMonth => "This Month",
            Self::LastMonth => "Last Month",
            Self::ThisQuarter => "This Quarter",
            Self::LastQuarter => "Last Quarter",
            Self::ThisYear => "This Year",
            Self::LastYear => "Last Year",
            Self::Custom => "Custom Range",
        }
    }
}

/// A resolved, inclusive UTC range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ResolvedRange {
    /// Number of calendar days covered, inclusive of both ends.
    pub fn days(&self) -> i64 {
        (self.end.date_naive() - self.start.date_naive()).num_days() + 1
    }
}

/// Resolve a selector relative to the current instant.
pub fn resolve(
    range: DateRange,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
) -> Result<ResolvedRange> {
    resolve_at(range, custom_start, custom_end, Utc::now())
}

/// Resolve a selector relative to an explicit `now` (deterministic for tests).
pub fn resolve_at(
    range: DateRange,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<ResolvedRange> {
    let today = now.date_naive();

    let (start, end) = match range {
        DateRange::Today => (today, today),
        DateRange::Yesterday => {
            let y = today - Duration::days(1);
            (y, y)
        }
        DateRange::Last7Days => (today - Duration::days(6), today),
        DateRange::Last30Days => (today - Duration::days(29), today),
        DateRange::Last90Days => (today - Duration::days(89), today),
        DateRange::ThisMonth => (start_of_month(today), today),
        DateRange::LastMonth => {
            let first_this = start_of_month(today);
            let last_prev = first_this - Duration::days(1);
            (start_of_month(last_prev), last_prev)
        }
        DateRange::ThisQuarter => (start_of_quarter(today), today),
        DateRange::LastQuarter => {
            let first_this = start_of_quarter(today);
            let last_prev = first_this - Duration::days(1);
            (start_of_quarter(last_prev), last_prev)
        }
        DateRange::ThisYear => (start_of_year(today), today),
        DateRange::LastYear => {
            let first_this = start_of_year(today);
            let last_prev = first_this - Duration::days(1);
            (start_of_year(last_prev), last_prev)
        }
        DateRange::Custom => {
            let (s, e) = match (custom_start, custom_end) {
                (Some(s), Some(e)) => (s, e),
                _ => {
                    return Err(ReportFlowError::InvalidRange(
                        "custom range requires both start and end dates".into(),
                    ));
                }
            };
            if s > e {
                return Err(ReportFlowError::InvalidRange(format!(
                    "custom range start {s} is after end {e}"
                )));
            }
            (s, e)
        }
    };

    Ok(ResolvedRange {
        start: day_start(start),
        end: day_end(end),
    })
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(end))
}

fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn start_of_quarter(date: NaiveDate) -> NaiveDate {
    let quarter_month = ((date.month0() / 3) * 3) + 1;
    NaiveDate::from_ymd_opt(date.year(), quarter_month, 1).unwrap_or(date)
}

fn start_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}
