// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Contract violations (double attach, lifecycle misuse, `set_runnable`, ...)
//! are not represented here: they panic, because they indicate a bug in the
//! caller rather than a condition anyone should recover from.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecStreamError {
    /// Cooperative abort observed by the scheduler after an invocation.
    #[error("execution aborted")]
    Aborted,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in stream graph: {0}")]
    GraphCycle(String),

    /// A stream rejected its static configuration during `prepare`.
    #[error("failed to prepare stream '{stream}': {reason}")]
    Prepare { stream: String, reason: String },

    /// A data error raised by an operator (truncation, bad cast, ...).
    #[error("stream '{stream}' failed: {message}")]
    Operator { stream: String, message: String },

    #[error("buffer capacity exceeded: needed {needed} bytes, {available} available")]
    BufferCapacity { needed: usize, available: usize },

    #[error("dynamic parameter {0} is not defined")]
    DynamicParam(u32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecStreamError {
    /// Whether this error is the cooperative abort signal.
    pub fn is_abort(&self) -> bool {
        matches!(self, ExecStreamError::Aborted)
    }

    pub(crate) fn prepare(stream: &str, reason: impl Into<String>) -> Self {
        ExecStreamError::Prepare {
            stream: stream.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn operator(stream: &str, message: impl Into<String>) -> Self {
        ExecStreamError::Operator {
            stream: stream.to_string(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ExecStreamError>;
