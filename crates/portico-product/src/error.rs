//! Error types of the directory client and of configuration loading.

use portico_core::error::PorticoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("directory answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("directory client could not be built: {0}")]
    Client(String),
}

impl From<DirectoryError> for PorticoError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Client(msg) => PorticoError::Internal(msg),
            other => PorticoError::Upstream {
                detail: other.to_string(),
            },
        }
    }
}

/// A `PORTICO_*` variable could not be turned into configuration.
#[derive(Debug, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(#[from] config::ConfigError);

impl From<ConfigError> for PorticoError {
    fn from(err: ConfigError) -> Self {
        PorticoError::Internal(err.to_string())
    }
}
