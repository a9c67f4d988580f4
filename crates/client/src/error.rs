//! Client Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A client error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport-level failure (connect, TLS, timeout). The next source in
    /// the fallback chain should be tried.
    #[display("network error")]
    Network,
    /// The source answered with a non-success status. Also a
    /// fallback-triggering failure, never surfaced on its own.
    #[display("source returned HTTP {_0}")]
    Status(#[error(not(source))] u16),
    /// The record, collection, or repo does not exist on this source.
    /// Callers usually map this to an absent value rather than an error.
    #[display("not found")]
    NotFound,
    /// The response body was not the expected shape.
    #[display("malformed response")]
    Malformed,
    /// A string was not a valid `at://` record URI.
    #[display("invalid at-uri: {_0}")]
    InvalidUri(#[error(not(source))] String),
    /// Terminal: every candidate source failed. The last source's failure is
    /// attached as the cause.
    #[display("all sources failed")]
    AllSourcesFailed,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Status(500..))
    }
}
