//! Next-run computation for schedule recurrence rules.
//!
//! All rules evaluate in the schedule's own timezone and return a UTC instant.
//! The result is always the earliest future occurrence, so recomputing after
//! every execution attempt (success or failure) can never leave a schedule
//! stuck in the past.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::types::{Frequency, ScheduleDefinition};

/// Next run instant for a schedule, strictly after `after`.
pub fn next_run_for(schedule: &ScheduleDefinition, after: DateTime<Utc>) -> DateTime<Utc> {
    compute_next_run(
        schedule.frequency,
        &schedule.time_of_day,
        schedule.day_of_week,
        schedule.day_of_month,
        &schedule.timezone,
        after,
    )
}

/// Core recurrence math. `day_of_week` is 0=Sunday..6=Saturday; `day_of_month`
/// is 1..31 or -1 for the last day of the month. CUSTOM recurs daily.
pub fn compute_next_run(
    frequency: Frequency,
    time_of_day: &str,
    day_of_week: Option<u8>,
    day_of_month: Option<i8>,
    timezone: &str,
    after: DateTime<Utc>,
) -> DateTime<Utc> {
    let tz: Tz = timezone.parse().unwrap_or_else(|_| {
        tracing::warn!("⚠️ Unknown timezone '{timezone}', falling back to UTC");
        chrono_tz::UTC
    });
    let local_now = after.with_timezone(&tz).naive_local();
    let time = parse_time_of_day(time_of_day);
    let today = local_now.date();

    let candidate = match frequency {
        Frequency::Daily | Frequency::Custom => next_daily(today, time, local_now),
        Frequency::Weekly => match day_of_week {
            Some(dow) => {
                let target = u32::from(dow) % 7;
                let current = today.weekday().num_days_from_sunday();
                let mut delta = (target + 7 - current) % 7;
                if delta == 0 && today.and_time(time) <= local_now {
                    delta = 7;
                }
                (today + Duration::days(i64::from(delta))).and_time(time)
            }
            None => next_daily(today, time, local_now),
        },
        Frequency::Monthly => match day_of_month {
            Some(-1) => {
                let this_month = last_day_of_month(today).and_time(time);
                if this_month > local_now {
                    this_month
                } else {
                    last_day_of_month(first_of_next_month(today)).and_time(time)
                }
            }
            Some(day) if day >= 1 => {
                let day = day as u32;
                let this_month = clamp_to_month(today, day).and_time(time);
                if this_month > local_now {
                    this_month
                } else {
                    clamp_to_month(first_of_next_month(today), day).and_time(time)
                }
            }
            _ => next_daily(today, time, local_now),
        },
    };

    localize(&tz, candidate)
}

fn next_daily(today: NaiveDate, time: NaiveTime, local_now: NaiveDateTime) -> NaiveDateTime {
    let candidate = today.and_time(time);
    if candidate > local_now {
        candidate
    } else {
        (today + Duration::days(1)).and_time(time)
    }
}

/// Parse "HH:MM"; malformed input falls back to midnight with a warning.
fn parse_time_of_day(s: &str) -> NaiveTime {
    let mut parts = s.splitn(2, ':');
    let hour = parts.next().and_then(|p| p.trim().parse().ok());
    let minute = parts.next().and_then(|p| p.trim().parse().ok());
    match (hour, minute) {
        (Some(h), Some(m)) if h < 24 && m < 60 => {
            NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
        }
        _ => {
            tracing::warn!("⚠️ Invalid time of day '{s}', using 00:00");
            NaiveTime::MIN
        }
    }
}

/// Map a local wall-clock time to UTC, resolving DST folds to the earlier
/// offset and DST gaps to one hour later.
fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(first, _) => first.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => Utc.from_utc_datetime(&naive),
            }
        }
    }
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first.checked_add_months(Months::new(1)).unwrap_or(first)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_of_next_month(date) - Duration::days(1)
}

/// Day-of-month clamped to the month's length (the 31st in June means the 30th).
fn clamp_to_month(any_day_in_month: NaiveDate, day: u32) -> NaiveDate {
    let last = last_day_of_month(any_day_in_month);
    any_day_in_month
        .with_day(day.min(last.day()))
        .unwrap_or(last)
}
