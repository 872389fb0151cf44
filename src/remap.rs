//! Substitution of a dataset's time axis.
//!
//! The host drives a [`TimeRemapper`] through three passes per update: it asks for the
//! published time steps ([`TimeRemapper::request_information`]), maps the time the
//! viewer asks for back to the upstream time ([`TimeRemapper::request_update_extent`]),
//! and finally produces the output ([`TimeRemapper::apply`]).

use log::{debug, warn};
use std::path::Path;

use crate::dataset::Dataset;
use crate::error::{RemapError, Result};
use crate::time_list::TimeList;

pub const CURRENT_DATE: &str = "current_date";
pub const TIME_UNITS: &str = "time_units";

/// Positional substitution: returns `time_list` as is if it has one value per host step.
pub fn remap_time_values(host_step_times: &[f64], time_list: &[f64]) -> Result<Vec<f64>> {
    if host_step_times.len() != time_list.len() {
        return Err(RemapError::LengthMismatch { expected: host_step_times.len(), found: time_list.len() });
    }
    Ok(time_list.to_vec())
}

/// time steps and range published downstream
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInfo {
    pub time_steps: Vec<f64>,
    pub time_range: Option<(f64, f64)>,
}

/// what to ask the upstream source for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpstreamRequest {
    pub step_index: usize,
    pub upstream_time: f64,
}

#[derive(Debug, Clone)]
pub struct TimeRemapper {
    time_list: TimeList,
    orig_times: Vec<f64>,
}

impl TimeRemapper {
    /// Reads the time list from `source` and checks it against the host's step times.
    pub fn configure(source: &Path, host_step_times: &[f64]) -> Result<Self> {
        let time_list = TimeList::read(source)?;
        TimeRemapper::new(time_list, host_step_times)
    }

    pub fn new(time_list: TimeList, host_step_times: &[f64]) -> Result<Self> {
        if time_list.is_empty() {
            return Err(RemapError::config("time list is empty"));
        }
        remap_time_values(host_step_times, time_list.values())?;
        debug!("remapping {} time steps, units: {:?}", time_list.len(), time_list.units());
        Ok(TimeRemapper { time_list, orig_times: host_step_times.to_vec() })
    }

    /// Replaces the held time list and original times. On error the current
    /// configuration is kept.
    pub fn reconfigure(&mut self, source: &Path, host_step_times: &[f64]) -> Result<()> {
        *self = TimeRemapper::configure(source, host_step_times)?;
        Ok(())
    }

    pub fn time_list(&self) -> &TimeList {
        &self.time_list
    }

    pub fn request_information(&self) -> PipelineInfo {
        PipelineInfo { time_steps: self.time_list.values().to_vec(), time_range: self.time_list.time_range() }
    }

    /// Maps a requested (new) time to its step. Unknown or missing times fall back to the first step.
    pub fn request_update_extent(&self, requested_time: Option<f64>) -> UpstreamRequest {
        let step_index = match requested_time {
            Some(t) => self.time_list.values().iter().position(|&v| v == t).unwrap_or_else(|| {
                warn!("requested time {t} is not a remapped time step, using the first step");
                0
            }),
            None => 0,
        };
        UpstreamRequest { step_index, upstream_time: self.orig_times[step_index] }
    }

    pub fn label(&self, step_index: usize) -> Result<String> {
        self.time_list.label(step_index)
    }

    /// Produces a copy of `dataset` with the remapped time steps, the `time_units` of the
    /// time list (replacing any field that looks like time units) and the `current_date`
    /// label of `step_index`. `dataset` itself is never touched.
    pub fn apply(&self, dataset: &Dataset, step_index: usize) -> Result<Dataset> {
        let time_steps = remap_time_values(&dataset.time_steps, self.time_list.values())?;
        let current_date = self.time_list.label(step_index)?;

        let mut output = dataset.clone();
        output.time_steps = time_steps;

        let removed = output.remove_fields(|name| {
            let name = name.to_ascii_lowercase();
            name.contains("time") && name.contains("units")
        });
        if !removed.is_empty() {
            debug!("removed time unit fields {removed:?}");
        }
        if let Some(units) = self.time_list.units() {
            output.set_string_field(TIME_UNITS, units);
        }
        output.set_string_field(CURRENT_DATE, current_date);

        Ok(output)
    }
}
