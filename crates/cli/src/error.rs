//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Input could not be opened
    #[error("Failed to open input '{input}': {message}")]
    InputOpen { input: String, message: String },

    /// Tee stopped with an error
    #[error("Tee run failed: {0}")]
    Run(#[from] tee::TeeError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn input_open(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputOpen {
            input: input.into(),
            message: message.into(),
        }
    }
}
