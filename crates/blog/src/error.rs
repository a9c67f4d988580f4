//! Blog Aggregation Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A blog aggregation error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for blog aggregation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Deliberately short: per-schema fetch trouble is isolated and logged, not
/// raised, so the only way the whole aggregation fails is having no repo to
/// read from at all.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The owner's identity could not be resolved, so no collection can be
    /// listed from anywhere.
    #[display("could not resolve the site owner's identity")]
    Identity,
}

impl ErrorKind {
    /// Convert an identity error, preserving its error tree as a child.
    #[track_caller]
    pub fn identity(err: burrow_identity::error::Error) -> Error {
        err.raise(ErrorKind::Identity)
    }
}
