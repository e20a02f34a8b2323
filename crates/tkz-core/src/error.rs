//! Unified error types for the TKZ ecosystem
//!
//! This module provides a common error type [`TkzError`] that can represent
//! errors from any part of the system. The calculation, parsing and catalog
//! layers all converge on it so that the CLI can report failures uniformly.
//!
//! # Example
//!
//! ```ignore
//! use tkz_core::{TkzError, TkzResult};
//!
//! fn evaluate(expr: &str) -> TkzResult<()> {
//!     let system = parse_system(expr, voltage)?;
//!     print_currents(&system)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all TKZ operations.
#[derive(Error, Debug)]
pub enum TkzError {
    /// Malformed user input: chain expressions, argument arity, empty
    /// required fields, both-absent insert arguments.
    #[error("bad input: {0}")]
    BadInput(String),

    /// An impedance query for a valid element returned no scalar.
    #[error("not in catalog: {0}")]
    NotInCatalog(String),

    /// Foreign-key or uniqueness violation outside an expected dedup path.
    #[error("integrity fault: {0}")]
    Integrity(String),

    /// Unreadable or unparseable configuration / credentials file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other database error.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using TkzError.
pub type TkzResult<T> = Result<T, TkzError>;

impl TkzError {
    /// Wrap an arbitrary database-layer failure.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        TkzError::Backend(err.to_string())
    }

    /// Wrap a constraint violation.
    pub fn integrity(err: impl std::fmt::Display) -> Self {
        TkzError::Integrity(err.to_string())
    }

    /// True for errors raised by expected uniqueness/reference checks.
    pub fn is_integrity(&self) -> bool {
        matches!(self, TkzError::Integrity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TkzError::NotInCatalog("resistance R1 for 'QF 25A'".into());
        assert!(err.to_string().contains("not in catalog"));
        assert!(err.to_string().contains("QF 25A"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TkzError = io_err.into();
        assert!(matches!(err, TkzError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> TkzResult<()> {
            Err(TkzError::BadInput("test".into()))
        }

        fn outer() -> TkzResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
