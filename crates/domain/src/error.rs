//! Unified error types for the domain layer
//!
//! Provides a common error type for record validation and coercion so that
//! the store layer can classify failures without matching on strings.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Parse error (for value objects and field paths)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A JSON document could not be coerced to the record shape
    #[error("Record shape mismatch: {0}")]
    Shape(String),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// Use this when domain invariants are violated:
    /// - Values are outside allowed ranges
    /// - Required fields are empty
    ///
    /// # Example
    /// ```ignore
    /// if max > bounds.max {
    ///     return Err(DomainError::validation("hope max above configured bound"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid ID error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a shape mismatch error
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Shape(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("hope max out of range");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: hope max out of range");
    }

    #[test]
    fn test_invalid_id_error() {
        let err = DomainError::invalid_id("char-1");
        assert_eq!(err.to_string(), "Invalid ID format: char-1");
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        let err: DomainError = serde_err.into();
        assert!(matches!(err, DomainError::Shape(_)));
    }
}
