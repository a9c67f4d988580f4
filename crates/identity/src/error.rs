//! Identity Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An identity error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for identity operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The directory request itself failed (transport, timeout, non-2xx).
    /// Retrying later might succeed.
    #[display("directory request failed")]
    Network,
    /// The directory answered, but the document carries neither a canonical
    /// id nor a data host. Retrying won't help until the document changes.
    #[display("directory document missing canonical id or data host")]
    Incomplete,
    /// Terminal: no live resolution and no fallback for this identifier.
    /// Callers treat this as fatal only when nothing cached exists.
    #[display("could not resolve identity: {_0}")]
    Resolution(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::Resolution("alice.example.com".to_string()).to_string(),
            "could not resolve identity: alice.example.com",
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Network.is_retryable());
        assert!(!ErrorKind::Incomplete.is_retryable());
        assert!(!ErrorKind::Resolution(String::new()).is_retryable());
    }
}
