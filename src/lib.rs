//! Replace the time axis of NetCDF-derived datasets with time values read from a text file,
//! so that datasets with different time encodings can share one timeline. Supports dates
//! before the common era (zero and negative years).

pub mod calendar;
pub mod dataset;
pub mod error;
pub mod remap;
pub mod time_list;

pub use calendar::{format_current_date, CalendarOrigin, TimeUnit};
pub use dataset::{Dataset, FieldArray};
pub use error::{RemapError, Result};
pub use remap::{remap_time_values, PipelineInfo, TimeRemapper, UpstreamRequest, CURRENT_DATE, TIME_UNITS};
pub use time_list::TimeList;
