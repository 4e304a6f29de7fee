//! Error types for BDD Board

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using BDD Board Error
pub type Result<T> = std::result::Result<T, Error>;

/// BDD Board error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Resource not found: {kind} with id {id}")]
    NotFound { kind: String, id: String },

    #[error("Formula error: {0}")]
    Formula(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an IO error with the path that was being read.
    pub fn source_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::SourceRead {
            path: path.into(),
            source,
        }
    }

    /// Build a parse error for the given path.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
