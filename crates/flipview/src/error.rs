//! Error types for flipview

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the caller of the viewer
#[derive(Debug)]
pub enum Error {
    /// Unusable settings (zero capacity, no preload threads, bad window weights)
    InvalidConfiguration(String),

    /// Empty cache key
    InvalidKey,

    /// Root path does not exist
    NotFound(PathBuf),

    /// Root is a file with an unsupported extension, or neither file nor directory
    InvalidInput(PathBuf),

    /// Directory holds no supported images
    EmptyCollection(PathBuf),

    /// Directory could not be listed
    Io(io::Error),

    /// Background decode pool could not be started
    WorkerPool(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InvalidKey => write!(f, "Invalid key: cache keys must not be empty"),
            Error::NotFound(path) => write!(f, "Path does not exist: {}", path.display()),
            Error::InvalidInput(path) => {
                write!(f, "Unsupported file or path type: {}", path.display())
            }
            Error::EmptyCollection(path) => {
                write!(f, "No supported image files found in directory: {}", path.display())
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::WorkerPool(msg) => write!(f, "Preload pool error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<flipcache::Error> for Error {
    fn from(err: flipcache::Error) -> Self {
        match err {
            flipcache::Error::InvalidConfiguration(msg) => Error::InvalidConfiguration(msg),
            flipcache::Error::InvalidKey => Error::InvalidKey,
        }
    }
}
