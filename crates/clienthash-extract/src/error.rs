//! Error types for the extract crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while pulling a member out of a release asset.
#[derive(Error, Diagnostic, Debug)]
pub enum ExtractError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(clienthash_extract::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] clienthash_dl::error::DownloadError),

    #[error("Invalid zip archive: {0}")]
    #[diagnostic(code(clienthash_extract::invalid_archive))]
    InvalidArchive(String),

    #[error("Cannot decode zip entry `{member}`: {reason}")]
    #[diagnostic(
        code(clienthash_extract::unsupported_entry),
        help("Only unencrypted stored or deflated entries can be read")
    )]
    UnsupportedEntry { member: String, reason: String },

    #[error("Failed to run `{program}`: {source}")]
    #[diagnostic(
        code(clienthash_extract::spawn),
        help("Make sure the program exists and is executable")
    )]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    #[diagnostic(code(clienthash_extract::custom))]
    Custom(String),
}

/// A specialized Result type for extraction.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            ExtractError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

impl From<clienthash_utils::error::FileSystemError> for ExtractError {
    fn from(err: clienthash_utils::error::FileSystemError) -> Self {
        ExtractError::Custom(err.to_string())
    }
}

impl From<clienthash_utils::error::HashError> for ExtractError {
    fn from(err: clienthash_utils::error::HashError) -> Self {
        ExtractError::Custom(err.to_string())
    }
}
