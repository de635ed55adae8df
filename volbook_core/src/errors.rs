//! # Error Types
//!
//! Structured error types for volbook_core. The volume engine itself is total
//! and never produces an error — malformed measurement input degrades to zero
//! by design. Errors exist only at the persistence and report boundaries,
//! where they carry enough context to be handled programmatically.
//!
//! ## Example
//!
//! ```rust
//! use volbook_core::errors::{BookError, BookResult};
//!
//! fn require_rows(count: usize) -> BookResult<()> {
//!     if count == 0 {
//!         return Err(BookError::EmptyBook);
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for volbook_core operations
pub type BookResult<T> = Result<T, BookError>;

/// Structured error type for book persistence and report operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum BookError {
    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Report requested for a book with no measurement rows
    #[error("Measurement book has no rows to export")]
    EmptyBook,

    /// Report generation failed (template compilation or rendering)
    #[error("Report generation failed: {reason}")]
    ReportFailed { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BookError {
    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        BookError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        BookError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a ReportFailed error
    pub fn report_failed(reason: impl Into<String>) -> Self {
        BookError::ReportFailed {
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BookError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            BookError::FileError { .. } => "FILE_ERROR",
            BookError::FileLocked { .. } => "FILE_LOCKED",
            BookError::SerializationError { .. } => "SERIALIZATION_ERROR",
            BookError::VersionMismatch { .. } => "VERSION_MISMATCH",
            BookError::EmptyBook => "EMPTY_BOOK",
            BookError::ReportFailed { .. } => "REPORT_FAILED",
            BookError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = BookError::file_error("open", "/tmp/site.vbk", "permission denied");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: BookError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BookError::EmptyBook.error_code(), "EMPTY_BOOK");
        assert_eq!(
            BookError::report_failed("bad template").error_code(),
            "REPORT_FAILED"
        );
    }

    #[test]
    fn test_lock_errors_are_recoverable() {
        let locked = BookError::file_locked("site.vbk", "user@host", "2026-01-01T00:00:00Z");
        assert!(locked.is_recoverable());
        assert!(!BookError::EmptyBook.is_recoverable());
    }
}
