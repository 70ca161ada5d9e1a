use std::path::PathBuf;

use thiserror::Error;
use tokio_rusqlite::rusqlite;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document not found: {0}")]
    Missing(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid display name: {0}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
