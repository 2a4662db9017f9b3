//! Heuristic parsing of human-formatted dates and date ranges.
//!
//! Exported tables render a date cell either as a single date/time or as two
//! joined by an arrow (`→`). Date and time formats are ambiguous, so parsing
//! is a permissive union: every accepted date format is tried in combination
//! with every accepted time format, and the first combination that parses
//! wins. This is deliberately not validation; a day/month-ambiguous input
//! resolves to whichever format matches first.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use thiserror::Error;

/// The literal separator between the two halves of a range.
const RANGE_SEPARATOR: char = '\u{2192}';

/// Accepted date formats, in preference order.
const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%Y/%m/%d"];

/// Accepted time formats, in preference order.
const TIME_FORMATS: &[&str] = &["%H:%M", "%I:%M %p"];

/// An error from date or date-range parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
    /// The input matched no accepted date(+time) format.
    #[error("date parsing error: {0} is not a valid date")]
    InvalidDate(String),

    /// The input matched no accepted time-only format.
    #[error("date parsing error: {0} is not a valid time")]
    InvalidTime(String),

    /// The parsed wall-clock time does not exist in the target zone
    /// (skipped by a daylight-saving transition).
    #[error("date parsing error: {0} does not exist in the target zone")]
    NonexistentLocalTime(NaiveDateTime),
}

/// Parses a date or date range into a `(start, end)` pair in `zone`.
///
/// The input is split on the first arrow. The right half, when present, is
/// first tried as a full date(+time); if that fails it is tried as a bare
/// time and merged onto the left half's calendar date, which is how
/// "same day, end time only" ranges like `3:00 PM → 5:00 PM` are written.
/// Without a right half, `end == start`.
///
/// The returned pair always satisfies `start <= end`.
///
/// # Errors
///
/// Returns [`DateParseError`] naming the offending substring when either
/// half matches no accepted format.
pub fn parse_date_range<Tz: TimeZone>(
    input: &str,
    zone: &Tz,
) -> Result<(DateTime<Tz>, DateTime<Tz>), DateParseError> {
    let (left, right) = match input.split_once(RANGE_SEPARATOR) {
        Some((left, right)) => (left, Some(right)),
        None => (input, None),
    };

    let start = parse_date(left, zone)?;

    let end = match right {
        Some(right) => match parse_date(right, zone) {
            Ok(end) => end,
            Err(_) => {
                let time = parse_time(right)?;
                resolve_local(start.date_naive().and_time(time), zone)?
            }
        },
        None => start.clone(),
    };

    if end < start {
        return Ok((start.clone(), start));
    }
    Ok((start, end))
}

/// Parses a single date, with or without a time-of-day, in `zone`.
///
/// A date without a time is taken as midnight.
pub fn parse_date<Tz: TimeZone>(input: &str, zone: &Tz) -> Result<DateTime<Tz>, DateParseError> {
    let input = input.trim();

    for date_format in DATE_FORMATS {
        for time_format in TIME_FORMATS {
            let format = format!("{date_format} {time_format}");
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, &format) {
                return resolve_local(naive, zone);
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, date_format) {
            return resolve_local(date.and_time(NaiveTime::MIN), zone);
        }
    }

    Err(DateParseError::InvalidDate(input.to_string()))
}

/// Parses a bare time-of-day.
fn parse_time(input: &str) -> Result<NaiveTime, DateParseError> {
    let input = input.trim();

    for time_format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(input, time_format) {
            return Ok(time);
        }
    }

    Err(DateParseError::InvalidTime(input.to_string()))
}

/// Resolves a wall-clock datetime in `zone`.
///
/// An ambiguous local time (repeated by a daylight-saving transition)
/// resolves to the earliest valid instant.
fn resolve_local<Tz: TimeZone>(
    naive: NaiveDateTime,
    zone: &Tz,
) -> Result<DateTime<Tz>, DateParseError> {
    zone.from_local_datetime(&naive)
        .earliest()
        .ok_or(DateParseError::NonexistentLocalTime(naive))
}
