//! Date range resolution for report windows.
//!
//! A range is written `[DATE][-[DATE]]` where `DATE` is
//! `YYYY[MM[DD[HH[MM[SS]]]]]` in UTC. A bare date selects the whole unit it
//! names, so `2018` is the calendar year 2018 and `201803` is March 2018.
//! An open start means the epoch; an open end means the far-future
//! sentinel.
//!
//! | expression  | start        | end                |
//! |-------------|--------------|--------------------|
//! | (empty)     | 0            | sentinel           |
//! | `A`         | start of A   | one unit past A    |
//! | `A-`        | start of A   | sentinel           |
//! | `-B`        | 0            | one unit past B    |
//! | `A-B`       | start of A   | one unit past B    |

use crate::error::{AccountingError, Result};
use chrono::{Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)?(-(\d+)?)?$").expect("static regex is valid"));
static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?$").expect("static regex is valid")
});

/// Half-open interval of epoch seconds: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    /// Whether a job that ran from `start_time` to `end_time` overlaps the range.
    pub fn contains_job(&self, start_time: i64, end_time: i64) -> bool {
        end_time >= self.start && start_time < self.end
    }

    pub fn duration_seconds(&self) -> i64 {
        self.end - self.start
    }

    /// Parse `expr` (see module docs). `sentinel` is the far-future date used
    /// for open-ended ranges and must itself be a valid `DATE`.
    pub fn resolve(expr: Option<&str>, sentinel: &str) -> Result<Self> {
        let far_future = PartialDate::parse(sentinel)?.start_epoch();

        let expr = expr.map(str::trim).unwrap_or_default();
        if expr.is_empty() {
            return Ok(Self { start: 0, end: far_future });
        }

        let caps = RANGE
            .captures(expr)
            .ok_or_else(|| AccountingError::InvalidDateRange(expr.to_string()))?;
        let from = caps.get(1).map(|m| PartialDate::parse(m.as_str())).transpose()?;
        let has_hyphen = caps.get(2).is_some();
        let until = caps.get(3).map(|m| PartialDate::parse(m.as_str())).transpose()?;

        let start = from.as_ref().map(PartialDate::start_epoch).unwrap_or(0);
        let end = match (&from, has_hyphen, &until) {
            (_, _, Some(until)) => until.next_unit_epoch()?,
            (_, true, None) => far_future,
            (Some(from), false, None) => from.next_unit_epoch()?,
            (None, false, None) => far_future,
        };

        if start > end {
            return Err(AccountingError::InvalidDateRange(expr.to_string()));
        }

        Ok(Self { start, end })
    }
}

/// How many components a date string carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

/// A date given to some precision, e.g. `2018` or `20180315T12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialDate {
    start: NaiveDateTime,
    precision: DatePrecision,
}

impl PartialDate {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &str| AccountingError::InvalidDate {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let caps = DATE
            .captures(value)
            .ok_or_else(|| invalid("expected YYYY[MM[DD[HH[MM[SS]]]]]"))?;

        // Later groups can only match once all earlier ones have, since each
        // group is a fixed two digits anchored after the previous one.
        let components: Vec<u32> = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str().parse::<u32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| invalid("non-numeric component"))?;

        let precision = match components.len() {
            1 => DatePrecision::Year,
            2 => DatePrecision::Month,
            3 => DatePrecision::Day,
            4 => DatePrecision::Hour,
            5 => DatePrecision::Minute,
            _ => DatePrecision::Second,
        };

        let component = |i: usize, default: u32| components.get(i).copied().unwrap_or(default);
        let start = NaiveDate::from_ymd_opt(component(0, 1970) as i32, component(1, 1), component(2, 1))
            .and_then(|d| d.and_hms_opt(component(3, 0), component(4, 0), component(5, 0)))
            .ok_or_else(|| invalid("not a valid calendar date/time"))?;

        Ok(Self { start, precision })
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    /// Epoch seconds of the first instant covered by this date.
    pub fn start_epoch(&self) -> i64 {
        Utc.from_utc_datetime(&self.start).timestamp()
    }

    /// Epoch seconds one unit past this date at its own precision.
    pub fn next_unit_epoch(&self) -> Result<i64> {
        let next = match self.precision {
            DatePrecision::Year => self.start.checked_add_months(Months::new(12)),
            DatePrecision::Month => self.start.checked_add_months(Months::new(1)),
            DatePrecision::Day => self.start.checked_add_signed(Duration::days(1)),
            DatePrecision::Hour => self.start.checked_add_signed(Duration::hours(1)),
            DatePrecision::Minute => self.start.checked_add_signed(Duration::minutes(1)),
            DatePrecision::Second => self.start.checked_add_signed(Duration::seconds(1)),
        };

        next.map(|dt| Utc.from_utc_datetime(&dt).timestamp())
            .ok_or_else(|| AccountingError::InvalidDate {
                value: self.start.to_string(),
                reason: "date arithmetic overflowed".to_string(),
            })
    }
}
