//! Error types
//!
//! Transport failures are always surfaced. Ledger corruption is recovered by the
//! ledger itself and only escapes as `LedgerError` from the storage layer.

use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the design API or downloading an asset.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Network(format!("timeout: {}", err))
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_default(),
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Failure reading or writing the persisted change-detection ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger is corrupt: {0}")]
    Corrupt(String),

    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize ledger: {0}")]
    Serialize(String),
}

/// Top-level error for sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Icon locator resolution failed; the whole icon batch is discarded.
    #[error("icon extraction failed: {0}")]
    Extraction(#[source] TransportError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::ConfigError(err.to_string())
    }
}
