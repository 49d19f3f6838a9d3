//! Wire types for pushing files as multipart sets of small JSON messages.
//!
//! Every message is a JSON body plus string properties. A file becomes
//! `N` chunk messages (`{"data": "<base64>"}`, parts `1..=N`) followed by
//! one status message that closes the set.

pub mod constants;
pub mod envelope;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use envelope::Message;
pub use messages::{
    ChunkBody, ChunkHeader, FinalPart, MultipartMessage, StatusHeader, StatusReport,
};
pub use types::Compression;

/// Errors produced while reading multipart metadata.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing message property: {0}")]
    MissingProperty(String),

    #[error("invalid value for property {key}: {value:?}")]
    InvalidProperty { key: String, value: String },

    #[error("unknown compression: {0}")]
    UnknownCompression(String),
}
