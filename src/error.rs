use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chain file {path:?} is corrupt: {reason}")]
    CorruptChain { path: PathBuf, reason: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for LedgerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl LedgerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Storage failures, as opposed to caller or configuration mistakes
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::CorruptChain { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
