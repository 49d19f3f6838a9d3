//! Chunked file transfer over a size-capped JSON message transport.
//!
//! A file is read in raw windows sized so that, after optional deflate and
//! base64, every chunk fits the per-message budget. Chunks go out in order
//! as a multipart set and the transfer always closes with one status
//! message, whatever happened along the way.

mod chunked;
pub mod codec;
mod engine;
pub mod reassembly;
mod types;

pub use chunked::ChunkReader;
pub use codec::{DecodeError, decode_chunk, encode_chunk};
pub use engine::{TransferEngine, send_batch, transfer};
pub use reassembly::{DEFAULT_MAX_AGE, ReassembledFile, Reassembler, ReassemblyError};
pub use types::{
    LimitsError, MAX_MESSAGE_SIZE_LIMIT, TransferLimits, TransferOutcome, TransferRequest,
    TransferStatus, size_in_kb,
};

use hubdrop_session::TransportError;

/// Errors that end the chunk loop of a transfer.
///
/// These never escape [`transfer`]; they are folded into the
/// [`TransferOutcome`] and the closing status message.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("encoded chunk {part} is {encoded_len} bytes, budget is {limit}")]
    ChunkTooLarge {
        part: u32,
        encoded_len: usize,
        limit: usize,
    },

    #[error(transparent)]
    SendFailure(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Compressing a chunk failed.
    #[error("encode error: {0}")]
    Encode(#[source] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransferError {
    /// Terminal status this error maps to.
    pub fn status(&self) -> TransferStatus {
        match self {
            Self::ChunkTooLarge { .. } => TransferStatus::SizeExceeded,
            Self::SendFailure(_) | Self::Json(_) => TransferStatus::SendFailed,
            Self::Io(_) => TransferStatus::ReadFailed,
            Self::Encode(_) => TransferStatus::EncodeFailed,
        }
    }

    /// Human-readable status sent to the receiver.
    pub fn status_message(&self) -> String {
        match self {
            Self::ChunkTooLarge { .. } => {
                "encoded chunk size greater than max allowed size".to_string()
            }
            Self::Io(err) => format!("read failure: {err}"),
            Self::Encode(err) => format!("encode failure: {err}"),
            Self::SendFailure(_) | Self::Json(_) => format!("send failure: {self}"),
        }
    }
}
