//! Epoch handling and date labels.
//!
//! All dates are proleptic Gregorian with astronomical year numbering: year 0 is 1 BCE,
//! year -4 is 5 BCE. chrono's `NaiveDate` covers roughly ±262 000 years, which is all
//! the range we support.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use std::fmt;

use crate::error::{RemapError, Result};

// beyond this chrono can't represent the result anyway
const MAX_OFFSET_MILLIS: f64 = 1.0e16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl TimeUnit {
    pub fn parse(s: &str) -> Result<Self> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => TimeUnit::Seconds,
            "min" | "mins" | "minute" | "minutes" => TimeUnit::Minutes,
            "h" | "hr" | "hrs" | "hour" | "hours" => TimeUnit::Hours,
            "d" | "day" | "days" => TimeUnit::Days,
            "month" | "months" => TimeUnit::Months,
            "yr" | "yrs" | "year" | "years" => TimeUnit::Years,
            other => return Err(RemapError::format(format!("unknown time unit {other:?}"))),
        };
        Ok(unit)
    }

    /// fixed length in milliseconds, None for calendar units
    fn fixed_millis(&self) -> Option<i64> {
        match self {
            TimeUnit::Seconds => Some(1_000),
            TimeUnit::Minutes => Some(60_000),
            TimeUnit::Hours => Some(3_600_000),
            TimeUnit::Days => Some(86_400_000),
            TimeUnit::Months | TimeUnit::Years => None,
        }
    }

    fn months(&self) -> i64 {
        match self {
            TimeUnit::Years => 12,
            _ => 1,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Months => "months",
            TimeUnit::Years => "years",
        };
        f.write_str(s)
    }
}

/// Reference epoch plus the unit raw time values are counted in,
/// e.g. "days since -4000-01-01 00:00:00".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalendarOrigin {
    pub unit: TimeUnit,
    pub epoch: NaiveDateTime,
}

impl CalendarOrigin {
    pub fn new(unit: TimeUnit, epoch: NaiveDateTime) -> Self {
        CalendarOrigin { unit, epoch }
    }

    /// parse a CF style units string `<unit> since <date>[T| ]<time>`
    pub fn parse(units: &str) -> Result<Self> {
        let units = units.trim();
        let pos = units
            .to_ascii_lowercase()
            .find(" since ")
            .ok_or_else(|| RemapError::format(format!("no 'since' in time units {units:?}")))?;

        let unit = TimeUnit::parse(&units[..pos])?;
        let epoch = parse_datetime(&units[pos + " since ".len()..])?;
        Ok(CalendarOrigin { unit, epoch })
    }

    /// the date `raw` units after (or before, if negative) the epoch
    pub fn offset(&self, raw: f64) -> Result<NaiveDateTime> {
        if !raw.is_finite() {
            return Err(RemapError::format(format!("non-finite time value {raw}")));
        }

        if let Some(unit_millis) = self.unit.fixed_millis() {
            return add_millis(self.epoch, raw * unit_millis as f64);
        }

        // calendar units: whole months/years first, then the fraction of the
        // period that follows (or precedes) the shifted date
        let per = self.unit.months();
        let whole = raw.trunc();
        let frac = raw - whole;

        let total_months = whole * per as f64;
        if total_months.abs() > 4_000_000.0 {
            return Err(RemapError::format(format!("time value {raw} {} out of range", self.unit)));
        }
        let base = add_months(self.epoch, total_months as i64)?;
        if frac == 0.0 {
            return Ok(base);
        }

        let (start, end) = if frac > 0.0 {
            (base, add_months(base, per)?)
        } else {
            (add_months(base, -per)?, base)
        };
        let period_millis = end.signed_duration_since(start).num_milliseconds() as f64;
        add_millis(base, frac * period_millis)
    }
}

impl fmt::Display for CalendarOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} since {}", self.unit, format_datetime(&self.epoch))
    }
}

fn add_millis(dt: NaiveDateTime, millis: f64) -> Result<NaiveDateTime> {
    let millis = millis.round();
    if !millis.is_finite() || millis.abs() > MAX_OFFSET_MILLIS {
        return Err(RemapError::format(format!("time offset of {millis}ms out of range")));
    }
    dt.checked_add_signed(Duration::milliseconds(millis as i64))
        .ok_or_else(|| RemapError::format(format!("date out of range: {} + {millis}ms", format_datetime(&dt))))
}

fn add_months(dt: NaiveDateTime, n: i64) -> Result<NaiveDateTime> {
    let out_of_range = || RemapError::format(format!("date out of range: {} + {n} months", format_datetime(&dt)));
    let months = Months::new(u32::try_from(n.unsigned_abs()).map_err(|_| out_of_range())?);
    let shifted = if n >= 0 { dt.checked_add_months(months) } else { dt.checked_sub_months(months) };
    shifted.ok_or_else(out_of_range)
}

/// Converts a raw time value into a display label `YYYY-MM-DD HH:MM:SS` relative to `origin`.
///
/// Negative years get a leading '-' (`-0004-01-01 00:00:00` is 5 BCE). Offsets are rounded to
/// whole milliseconds, and a non-zero millisecond part is appended as `.mmm`.
pub fn format_current_date(raw: f64, origin: &CalendarOrigin) -> Result<String> {
    origin.offset(raw).map(|dt| format_datetime(&dt))
}

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    let year = dt.year();
    let sign = if year < 0 { "-" } else { "" };
    let mut s = format!(
        "{sign}{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year.unsigned_abs(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    );
    let millis = dt.nanosecond() / 1_000_000;
    if millis > 0 {
        s.push_str(&format!(".{millis:03}"));
    }
    s
}

/// Parse `[-+]Y-M-D[(T| )h:m[:s[.fff]]][Z]`. Years may be zero, negative or longer than 4 digits.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    let s = s.strip_suffix('Z').unwrap_or(s);

    let (date_part, time_part) = match s.split_once(|c: char| c == 'T' || c == ' ') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };

    let date = parse_date(date_part)?;
    let time = match time_part {
        Some(t) if !t.is_empty() => parse_time(t)?,
        _ => NaiveTime::MIN,
    };
    Ok(NaiveDateTime::new(date, time))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    let bad = || RemapError::format(format!("invalid date {s:?}"));

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let fields: Vec<&str> = body.split('-').collect();
    if fields.len() != 3 || fields.iter().any(|f| f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit())) {
        return Err(bad());
    }

    let year: i32 = fields[0].parse().map_err(|_| bad())?;
    let month: u32 = fields[1].parse().map_err(|_| bad())?;
    let day: u32 = fields[2].parse().map_err(|_| bad())?;
    let year = if negative { -year } else { year };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    let bad = || RemapError::format(format!("invalid time {s:?}"));

    let fields: Vec<&str> = s.split(':').collect();
    if fields.len() < 2 || fields.len() > 3 {
        return Err(bad());
    }
    let hour: u32 = fields[0].parse().map_err(|_| bad())?;
    let minute: u32 = fields[1].parse().map_err(|_| bad())?;
    let secs: f64 = match fields.get(2) {
        Some(f) => f.parse().map_err(|_| bad())?,
        None => 0.0,
    };
    if !(0.0..60.0).contains(&secs) {
        return Err(bad());
    }

    // 59.9996 must not round into a 60th second
    let millis = ((secs * 1000.0).round() as u32).min(59_999);
    NaiveTime::from_hms_milli_opt(hour, minute, millis / 1000, millis % 1000).ok_or_else(bad)
}

/// seconds from `from` to `to`, negative if `to` is earlier
pub fn seconds_between(from: &NaiveDateTime, to: &NaiveDateTime) -> f64 {
    to.signed_duration_since(*from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(units: &str) -> CalendarOrigin {
        CalendarOrigin::parse(units).unwrap()
    }

    #[test]
    fn test_parse_bce_datetime() {
        let dt = parse_datetime("-4000-01-01T00:00:00").unwrap();
        assert_eq!(dt.year(), -4000);
        assert_eq!(format_datetime(&dt), "-4000-01-01 00:00:00");

        let dt = parse_datetime("0000-02-29 12:30").unwrap(); // year 0 is a leap year
        assert_eq!(format_datetime(&dt), "0000-02-29 12:30:00");
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let dt = parse_datetime("2000-01-01T00:00:59.9999").unwrap();
        assert_eq!(format_datetime(&dt), "2000-01-01 00:00:59.999");

        let dt = parse_datetime("-0100-06-30T23:59:30.5").unwrap();
        assert_eq!(format_datetime(&dt), "-0100-06-30 23:59:30.500");

        let o = origin("seconds since 1999-12-31T23:59:59.9999");
        assert_eq!(format_current_date(0.001, &o).unwrap(), "2000-01-01 00:00:00");
        assert!(parse_datetime("2000-01-01T00:00:60").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_datetime("2000/01/01").is_err());
        assert!(parse_datetime("2000-13-01").is_err());
        assert!(parse_datetime("2000-01-01T25:00:00").is_err());
        assert!(parse_datetime("--2000-01-01").is_err());
    }

    #[test]
    fn test_parse_units() {
        let o = origin("days since 2000-01-01");
        assert_eq!(o.unit, TimeUnit::Days);
        assert_eq!(o.to_string(), "days since 2000-01-01 00:00:00");

        let o = origin("Seconds Since 2001-12-31T06:00:00Z");
        assert_eq!(o.unit, TimeUnit::Seconds);
        assert_eq!(o.to_string(), "seconds since 2001-12-31 06:00:00");

        assert!(matches!(CalendarOrigin::parse("fortnights since 2000-01-01"), Err(RemapError::Format(_))));
        assert!(matches!(CalendarOrigin::parse("days after 2000-01-01"), Err(RemapError::Format(_))));
    }

    #[test]
    fn test_years_before_year_one() {
        let o = CalendarOrigin::new(TimeUnit::Years, parse_datetime("0001-01-01").unwrap());
        assert_eq!(format_current_date(-5.0, &o).unwrap(), "-0004-01-01 00:00:00");
        assert_eq!(format_current_date(-1.0, &o).unwrap(), "0000-01-01 00:00:00");
    }

    #[test]
    fn test_fixed_units() {
        let o = origin("days since 2000-01-01");
        assert_eq!(format_current_date(0.0, &o).unwrap(), "2000-01-01 00:00:00");
        assert_eq!(format_current_date(1.5, &o).unwrap(), "2000-01-02 12:00:00");
        assert_eq!(format_current_date(-1.0, &o).unwrap(), "1999-12-31 00:00:00");

        let o = origin("seconds since -0001-12-31 23:59:59");
        assert_eq!(format_current_date(1.0, &o).unwrap(), "0000-01-01 00:00:00");
        assert_eq!(format_current_date(1.25, &o).unwrap(), "0000-01-01 00:00:00.250");
    }

    #[test]
    fn test_fractional_calendar_units() {
        // 2000 is a leap year: half of it is 183 days
        let o = origin("years since 2000-01-01");
        assert_eq!(format_current_date(0.5, &o).unwrap(), "2000-07-02 00:00:00");

        // month lengths are taken from the month being entered
        let o = origin("months since 2001-01-31");
        assert_eq!(format_current_date(1.0, &o).unwrap(), "2001-02-28 00:00:00");
        let o = origin("months since 2001-03-01");
        assert_eq!(format_current_date(-0.5, &o).unwrap(), "2001-02-15 00:00:00");
    }

    #[test]
    fn test_deterministic() {
        let o = origin("hours since -1200-06-15 00:00:00");
        let a = format_current_date(12345.678, &o).unwrap();
        let b = format_current_date(12345.678, &o).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_of_range() {
        let o = origin("years since 2000-01-01");
        assert!(matches!(format_current_date(1.0e9, &o), Err(RemapError::Format(_))));
        assert!(matches!(format_current_date(f64::NAN, &o), Err(RemapError::Format(_))));

        let o = origin("seconds since 2000-01-01");
        assert!(matches!(format_current_date(f64::INFINITY, &o), Err(RemapError::Format(_))));
        assert!(matches!(format_current_date(1.0e15, &o), Err(RemapError::Format(_))));
    }

    #[test]
    fn test_seconds_between() {
        let a = parse_datetime("-4000-01-01T00:00:00").unwrap();
        let b = parse_datetime("-4000-01-02T00:00:00").unwrap();
        assert_eq!(seconds_between(&a, &b), 86_400.0);
        assert_eq!(seconds_between(&b, &a), -86_400.0);
    }
}
