//! Post Composition Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A composition error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for composition operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The given string is not a record URI. Caller bug, not network weather.
    #[display("invalid post uri: {_0}")]
    InvalidUri(#[error(not(source))] String),
    /// The author's identity could not be resolved, so there is nowhere to
    /// fetch the post from.
    #[display("could not resolve the post author")]
    Identity,
    /// Every source failed while fetching the post record.
    #[display("could not fetch the post record")]
    Fetch,
    /// An engagement endpoint misbehaved. Always recovered by falling back
    /// to whatever counters are available; never surfaced past the composer.
    #[display("engagement lookup failed")]
    Engagement,
}

impl ErrorKind {
    /// Convert an identity error, preserving its error tree as a child.
    #[track_caller]
    pub fn identity(err: burrow_identity::error::Error) -> Error {
        err.raise(ErrorKind::Identity)
    }

    /// Convert a client error, preserving its error tree as a child.
    #[track_caller]
    pub fn fetch(err: burrow_client::error::Error) -> Error {
        err.raise(ErrorKind::Fetch)
    }
}
