use thiserror::Error;

pub type Result<T> = std::result::Result<T, RemapError>;

/// Everything that can go wrong while configuring or applying a time remap.
/// All of these are reported before any output is produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RemapError {
    /// bad, missing or empty time list source
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("number of time values ({found}) doesn't match time steps in data ({expected})")]
    LengthMismatch { expected: usize, found: usize },

    /// unparseable epoch / unit description or an unrepresentable date
    #[error("format error: {0}")]
    Format(String),

    #[error("time step {index} out of range, dataset has {steps} steps")]
    StepOutOfRange { index: usize, steps: usize },
}

impl RemapError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        RemapError::Configuration(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        RemapError::Format(msg.into())
    }
}
