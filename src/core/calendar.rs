//! Calendar arithmetic for the shared master grid.
//!
//! All series share one calendar at a fixed frequency: month-start buckets for
//! monthly data, Monday-anchored weeks for weekly data. Timestamps are always
//! midnight UTC on the bucket anchor.

use crate::config::Granularity;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use std::collections::BTreeSet;

/// Snap a timestamp down to its bucket anchor.
pub fn align_to_period(ts: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
    let date = ts.date_naive();
    let anchor = match granularity {
        Granularity::Monthly => date.with_day(1).unwrap_or(date),
        Granularity::Weekly => {
            let days_from_monday = date.weekday().num_days_from_monday() as i64;
            date - Duration::days(days_from_monday)
        }
    };
    Utc.from_utc_datetime(&anchor.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// The anchor one period after `ts` (which must itself be an anchor).
pub fn next_period(ts: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
    match granularity {
        Granularity::Monthly => ts
            .checked_add_months(Months::new(1))
            .unwrap_or(ts + Duration::days(31)),
        Granularity::Weekly => ts + Duration::days(7),
    }
}

/// All bucket anchors from `start` to `end` inclusive.
pub fn date_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    granularity: Granularity,
) -> Result<Vec<DateTime<Utc>>> {
    if start > end {
        return Err(ForecastError::Timestamp(
            "calendar start must not be after end".to_string(),
        ));
    }
    let mut current = align_to_period(start, granularity);
    let end = align_to_period(end, granularity);
    let mut range = Vec::new();
    while current <= end {
        range.push(current);
        current = next_period(current, granularity);
    }
    Ok(range)
}

/// The `horizon` anchors immediately following `last`.
pub fn future_periods(
    last: DateTime<Utc>,
    granularity: Granularity,
    horizon: usize,
) -> Vec<DateTime<Utc>> {
    let mut periods = Vec::with_capacity(horizon);
    let mut current = align_to_period(last, granularity);
    for _ in 0..horizon {
        current = next_period(current, granularity);
        periods.push(current);
    }
    periods
}

/// Holiday signal, consumed as already-resolved dates. The pipeline never
/// parses holiday calendars itself; it only checks membership.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    pub fn is_holiday(&self, ts: DateTime<Utc>) -> bool {
        self.dates.contains(&ts.date_naive())
    }

    /// One boolean flag per timestamp, in order. This is the shape the hosted
    /// API request expects for exogenous signals.
    pub fn flags_for(&self, timestamps: &[DateTime<Utc>]) -> Vec<bool> {
        timestamps.iter().map(|&t| self.is_holiday(t)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
