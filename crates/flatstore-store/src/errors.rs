//! Error handling for flatstore-store
//!
//! Wraps flatstore-core ExError with filesystem-specific helpers

use std::path::Path;

use flatstore_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create an error for a file that could not be parsed
pub fn parse_error(path: &Path, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Configuration)
        .with_op("parse_file")
        .with_message(format!("Unable to parse {}: {}", path.display(), reason))
}

/// Create a configuration error
pub fn config_error(operation: &str, reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::Configuration)
        .with_op(operation.to_string())
        .with_message(reason)
}
