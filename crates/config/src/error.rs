//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Could not read or deserialize the layered configuration sources.
    #[display("failed to load configuration")]
    Load,
    /// A value was read successfully but fails validation. Fix the named
    /// field in the configuration file (or matching environment variable).
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] &'static str),
    /// No usable config directory on this platform and no explicit path given.
    #[display("could not determine a configuration directory")]
    NoConfigDir,
}
