use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(clienthash_config::toml_deserialize),
        help("Check your clienthash.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Invalid client document `{path}`: {source}")]
    #[diagnostic(
        code(clienthash_config::clients),
        help("The document must be a JSON array of client descriptors")
    )]
    ClientsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read `{path}`: {source}")]
    #[diagnostic(code(clienthash_config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Client '{client}': {reason}")]
    #[diagnostic(
        code(clienthash_config::invalid_client),
        help("Fix the client descriptor in the client document")
    )]
    InvalidClient { client: String, reason: String },

    #[error("Missing required configuration value: {0}")]
    #[diagnostic(code(clienthash_config::missing_value))]
    MissingValue(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
