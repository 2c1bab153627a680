//! Error types for stator core types.

use thiserror::Error;

/// Result type alias for service descriptor checks.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors raised by the service descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// One or more fields failed validation, comma-joined in field order.
    #[error("invalid Service: {}", .0.join(","))]
    Invalid(Vec<String>),
}

impl ServiceError {
    /// The individual violations, in field order.
    pub fn violations(&self) -> &[String] {
        match self {
            ServiceError::Invalid(v) => v,
        }
    }
}

/// A config duration that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid duration {input:?}: {source}")]
pub struct DurationError {
    pub input: String,
    #[source]
    pub source: humantime::DurationError,
}
