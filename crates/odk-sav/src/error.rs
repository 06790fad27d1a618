//! Error types for SAV file operations.

use thiserror::Error;

/// Errors that can occur when writing SAV files.
#[derive(Debug, Error)]
pub enum SavError {
    /// A dictionary needs at least one variable.
    #[error("a system file needs at least one variable")]
    NoVariables,

    /// Variable name is empty or longer than 64 bytes.
    #[error("invalid variable name: {name:?}")]
    InvalidVariableName { name: String },

    /// Two variables share a name (compared case-insensitively).
    #[error("duplicate variable name: {name}")]
    DuplicateVariable { name: String },

    /// String width outside 1..=255.
    #[error("variable {name} has unsupported string width {width}")]
    InvalidWidth { name: String, width: u16 },

    /// Case length mismatch.
    #[error("case length mismatch: expected {expected}, got {actual}")]
    CaseLengthMismatch { expected: usize, actual: usize },

    /// A value does not match its variable type.
    #[error("variable {name} expects a {expected} value")]
    TypeMismatch { name: String, expected: &'static str },

    /// More cases than the header can count.
    #[error("case count overflow")]
    CaseCountOverflow,

    /// Input is not a system file written by this crate.
    #[error("invalid SAV file: {message}")]
    InvalidFormat { message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SavError {
    pub(crate) fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

/// Result type for SAV operations.
pub type Result<T> = std::result::Result<T, SavError>;
