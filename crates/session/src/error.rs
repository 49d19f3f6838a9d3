//! Session error types.

use crate::types::AttemptFailure;

/// Errors produced while deriving device credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid base64 credential: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Errors reported by the transport and provisioning collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("registration failed: {0}")]
    Registration(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("not connected")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Fatal errors from session establishment. No transfer may run after one.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    InvalidCredential(#[from] CredentialError),

    #[error("connection attempts exhausted after {attempts} tries")]
    AttemptsExhausted {
        attempts: u32,
        failures: Vec<AttemptFailure>,
    },
}
