//! Site Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A site error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for site operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Process-level wiring failed (HTTP client construction). Nothing will
    /// work; bail out of startup.
    #[display("failed to assemble the site context")]
    Init,
    /// The owner's profile could not be produced at all: no cache, no
    /// fallback identity, or every source failed. This is the one failure
    /// that surfaces as a page-level error.
    #[display("could not load the site owner's profile")]
    Profile,
}

impl ErrorKind {
    /// Convert an identity error, preserving its error tree as a child.
    #[track_caller]
    pub fn profile_identity(err: burrow_identity::error::Error) -> Error {
        err.raise(ErrorKind::Profile)
    }

    /// Convert a client error, preserving its error tree as a child.
    #[track_caller]
    pub fn profile_fetch(err: burrow_client::error::Error) -> Error {
        err.raise(ErrorKind::Profile)
    }
}
