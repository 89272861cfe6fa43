//! Client error types.

use thiserror::Error;

use quickcal_protocol::ProtocolError;
use quickcal_providers::ProviderError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The user's input cannot be submitted as-is.
    #[error("{0}")]
    Input(String),

    /// The native-messaging stream broke.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// True when the fix is to (re)run `quickcal auth google`.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_auth())
    }
}
