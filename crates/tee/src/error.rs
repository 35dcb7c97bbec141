//! Tee error types

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Terminal condition of a tee run
#[derive(Debug, Error)]
pub enum TeeError {
    /// Source read failed
    #[error("source read failed: {0}")]
    Source(#[source] contracts::ContractError),

    /// Every output failed or detached
    #[error("all outputs failed")]
    AllOutputsFailed,

    /// Cancellation fired before the source was exhausted
    #[error("tee run cancelled")]
    Cancelled,

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Invalid builder input
    #[error("invalid tee configuration: {0}")]
    InvalidConfig(String),
}

impl TeeError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Terminal error of a single output
///
/// Only the first error recorded for an output is kept.
#[derive(Debug, Clone, Error)]
pub enum OutputError {
    /// Sink write returned an error
    #[error("write failed: {0}")]
    Write(Arc<contracts::ContractError>),

    /// Sink accepted fewer bytes than the chunk held
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Detach policy stall timeout elapsed
    ///
    /// A write in flight at that moment is abandoned; part of that chunk may
    /// already have reached the destination uncounted.
    #[error("stalled for more than {timeout:?}, output detached")]
    Stalled { timeout: Duration },

    /// Sink close returned an error
    #[error("close failed: {0}")]
    Close(Arc<contracts::ContractError>),

    /// Sink worker task panicked
    #[error("sink worker panicked")]
    WorkerPanicked,
}

impl OutputError {
    /// True if this error detached the output
    pub fn is_stall(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }
}
