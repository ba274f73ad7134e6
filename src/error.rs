//! Structured errors shared by both conversion directions.

use thiserror::Error;

/// Error returned by the conversion entry points and their collaborators.
///
/// The variant is the machine-readable tag; the payload carries the
/// human-readable detail. `MissingRequiredField` holds the bare field name so
/// callers can tell which requirement was violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConversionError {
    /// Input could not be parsed into the expected representation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A field required by the target format is absent or empty.
    #[error("missing required field: {0}")]
    MissingRequiredField(String),
    /// The input parsed but is not a convertible document or event.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// An unexpected failure while rebuilding the other representation.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),
    /// A well-formed event failed an integrity check.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
}
