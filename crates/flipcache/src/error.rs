//! Error types for flipcache

use std::fmt;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`ImageStore`](crate::ImageStore)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Store constructed with an unusable setting (zero capacity)
    InvalidConfiguration(String),

    /// Empty key passed to `get` or `put`
    InvalidKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InvalidKey => write!(f, "Invalid key: cache keys must not be empty"),
        }
    }
}

impl std::error::Error for Error {}
