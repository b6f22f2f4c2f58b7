//! Error types for drivedocs.
//!
//! Library crates use [`DriveDocsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all drivedocs operations.
#[derive(Debug, thiserror::Error)]
pub enum DriveDocsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Credential loading or token refresh failed.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The remote folder listing could not be retrieved.
    #[error("listing error: {0}")]
    Listing(String),

    /// A file's content could not be downloaded or decoded.
    #[error("read error for {file_id}: {message}")]
    Read { file_id: String, message: String },

    /// The keyword backend failed or returned an unusable reply.
    #[error("tag extraction error: {0}")]
    TagExtraction(String),

    /// The file's declared type is outside what the reader can decode.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Network/HTTP error talking to a remote service.
    #[error("network error: {0}")]
    Network(String),

    /// Response or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad date, empty folder id, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DriveDocsError>;

impl DriveDocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a read error for a specific remote file.
    pub fn read(file_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Read {
            file_id: file_id.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
