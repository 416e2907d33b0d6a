use std::path::PathBuf;

use config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed image reference: {0}")]
    MalformedReference(String),

    #[error("Mapping conflict for {source_key}: existing {existing}, incoming {incoming}")]
    MappingConflict {
        source_key: String,
        existing: String,
        incoming: String,
    },

    #[error("Corrupt mapping store {path}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Unsupported release source: {0}")]
    UnsupportedReleaseSource(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Repository provisioning failed: {0}")]
    Provisioning(String),

    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid reference pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
