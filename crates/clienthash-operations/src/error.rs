//! Error types for version list generation.

use std::path::PathBuf;

use clienthash_config::error::ConfigError;
use clienthash_dl::error::DownloadError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum HashGenError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] DownloadError),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(clienthash::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize report {path}: {source}")]
    #[diagnostic(code(clienthash::report))]
    Report {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{0}")]
    #[diagnostic(code(clienthash::custom))]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, HashGenError>;

pub trait ErrorContext<T> {
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
            HashGenError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

impl From<clienthash_utils::error::FileSystemError> for HashGenError {
    fn from(err: clienthash_utils::error::FileSystemError) -> Self {
        HashGenError::Custom(err.to_string())
    }
}
