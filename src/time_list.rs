//! The user supplied time values, one entry per line.
//!
//! Entries are either plain numbers (optionally preceded by a units header such as
//! `# units: days since -0500-01-01`) or ISO style date-times like `-4000-01-01T00:00:00`.
//! Date-time lists are converted into seconds since their first entry.

use log::{debug, warn};
use serde::Serialize;
use std::{fs, path::Path};

use crate::calendar::{format_current_date, parse_datetime, seconds_between, CalendarOrigin, TimeUnit};
use crate::error::{RemapError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeList {
    values: Vec<f64>,
    units: Option<String>,
    origin: Option<CalendarOrigin>,
    /// verbatim per-step labels of date-time lists
    annotations: Option<Vec<String>>,
}

impl TimeList {
    /// a numeric list without calendar information
    pub fn from_values(values: Vec<f64>) -> Self {
        TimeList { values, units: None, origin: None, annotations: None }
    }

    pub fn with_origin(values: Vec<f64>, origin: CalendarOrigin) -> Self {
        TimeList { values, units: Some(origin.to_string()), origin: Some(origin), annotations: None }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| RemapError::config(format!("cannot read time list {}: {e}", path.display())))?;
        let list = TimeList::parse(&text)?;
        debug!("read {} time values from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut header: Option<&str> = None;
        let mut entries: Vec<(usize, &str)> = Vec::new();

        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() { continue }

            if let Some(comment) = line.strip_prefix('#') {
                if let Some(units) = units_header(comment) {
                    header = Some(units);
                }
                continue;
            }
            if entries.is_empty() && header.is_none() && line.to_ascii_lowercase().contains(" since ") {
                header = Some(line);
                continue;
            }
            entries.push((i + 1, line));
        }

        let Some(&(_, first)) = entries.first() else {
            return Err(RemapError::config("time list is empty"));
        };

        let list = if first.parse::<f64>().is_ok() {
            TimeList::from_numbers(&entries, header)?
        } else {
            if header.is_some() {
                warn!("ignoring units header, date-time entries are converted to seconds since the first entry");
            }
            TimeList::from_datetimes(&entries)?
        };

        if !list.is_monotonic() {
            warn!("time values are not monotonically increasing");
        }
        Ok(list)
    }

    fn from_numbers(entries: &[(usize, &str)], header: Option<&str>) -> Result<Self> {
        let values = entries
            .iter()
            .map(|&(line_no, entry)| match entry.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(RemapError::config(format!("line {line_no}: not a number: {entry:?}"))),
            })
            .collect::<Result<Vec<f64>>>()?;

        match header {
            Some(units) => {
                let origin = CalendarOrigin::parse(units)?;
                debug!("time list origin: {origin}");
                Ok(TimeList { values, units: Some(units.to_string()), origin: Some(origin), annotations: None })
            }
            None => Ok(TimeList::from_values(values)),
        }
    }

    fn from_datetimes(entries: &[(usize, &str)]) -> Result<Self> {
        let mut stamps = Vec::with_capacity(entries.len());
        let mut annotations = Vec::with_capacity(entries.len());

        for &(line_no, entry) in entries {
            let at_line = |e: RemapError| RemapError::config(format!("line {line_no}: {e}"));
            let (date, time) = split_entry(entry).map_err(at_line)?;
            stamps.push(parse_datetime(entry).map_err(at_line)?);
            annotations.push(format!("{date} {time}"));
        }

        // entries is non-empty and every entry passed split_entry
        let reference = stamps[0];
        let (ref_date, ref_time) = split_entry(entries[0].1)?;

        Ok(TimeList {
            values: stamps.iter().map(|dt| seconds_between(&reference, dt)).collect(),
            units: Some(format!("seconds since {ref_date} {ref_time}")),
            origin: Some(CalendarOrigin::new(TimeUnit::Seconds, reference)),
            annotations: Some(annotations),
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// true if no value is smaller than its predecessor
    pub fn is_monotonic(&self) -> bool {
        self.values.windows(2).all(|w| w[0] <= w[1])
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn origin(&self) -> Option<&CalendarOrigin> {
        self.origin.as_ref()
    }

    /// `[first, last]`, None for an empty list
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.values.first()?, *self.values.last()?))
    }

    /// The display label of step `index`. Date-time lists return the entry text,
    /// numeric lists are formatted from their origin or, without one, shown as plain numbers.
    pub fn label(&self, index: usize) -> Result<String> {
        let value = *self
            .values
            .get(index)
            .ok_or(RemapError::StepOutOfRange { index, steps: self.values.len() })?;

        if let Some(annotations) = &self.annotations {
            return Ok(annotations[index].clone());
        }
        match &self.origin {
            Some(origin) => format_current_date(value, origin),
            None => Ok(value.to_string()),
        }
    }
}

/// value of a `units: ...` / `time_units = ...` comment, if this comment is one
fn units_header(comment: &str) -> Option<&str> {
    let comment = comment.trim();
    let lower = comment.to_ascii_lowercase();
    let key = ["time_units", "time units", "units"].into_iter().find(|k| lower.starts_with(*k))?;

    let value = comment[key.len()..].trim_start();
    let value = value.strip_prefix(':').or_else(|| value.strip_prefix('=')).unwrap_or(value).trim();
    (lower.contains(" since ") && !value.is_empty()).then_some(value)
}

/// split `-4000-01-01T00:00:00` into its date and time text
fn split_entry(entry: &str) -> Result<(&str, &str)> {
    let (date, time) = entry
        .split_once('T')
        .ok_or_else(|| RemapError::format(format!("invalid format, no 'T' separator: {entry:?}")))?;
    if date.is_empty() || time.is_empty() {
        return Err(RemapError::format(format!(
            "incomplete date-time string {entry:?}: date={date:?}, time={time:?}"
        )));
    }
    Ok((date, time))
}
