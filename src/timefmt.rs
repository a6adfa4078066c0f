//! Timestamp handling.
//!
//! Every timestamp is stored as local time in the fixed-width form
//! `YYYY-MM-DD HH:MM:SS`. Because the format is zero-padded, range filters
//! compare the strings directly.

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current local time, truncated to whole seconds.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn format(ts: NaiveDateTime) -> String {
    ts.format(FORMAT).to_string()
}

pub fn parse(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, FORMAT).map_err(|_| Error::Timestamp {
        value: value.to_string(),
    })
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate {
        input: value.to_string(),
    })
}

/// Whole seconds from `start` to `end`, never negative.
pub fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_seconds().max(0)
}
