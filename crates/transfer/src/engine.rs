//! The chunked transfer engine.
//!
//! One transfer runs `Sizing -> Streaming -> (Completed | SizeExceeded |
//! SendFailed) -> Closing`. Chunks are produced and sent strictly in
//! order; the closing status message is sent exactly once per transfer.

use hubdrop_protocol::{
    ChunkBody, ChunkHeader, Compression, FinalPart, Message, StatusHeader, StatusReport,
};
use hubdrop_session::Session;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};

use crate::chunked::ChunkReader;
use crate::codec::encode_chunk;
use crate::types::{TransferLimits, TransferOutcome, TransferRequest, TransferStatus, size_in_kb};
use crate::TransferError;

const MSG_COMPLETED: &str = "completed";

/// Sends files over a [`Session`] as multipart message sets.
#[derive(Debug, Clone, Default)]
pub struct TransferEngine {
    limits: TransferLimits,
}

/// Identity shared by every message of one transfer.
struct TransferContext<'a> {
    session_id: &'a str,
    destination: &'a str,
    compression: Compression,
    budget: usize,
}

/// Counters for the chunk loop.
#[derive(Default)]
struct Progress {
    parts: u32,
    sent: u32,
    skipped: u32,
    bytes: u64,
}

impl TransferEngine {
    /// Creates an engine with the default [`TransferLimits`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with custom limits.
    pub fn with_limits(limits: TransferLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &TransferLimits {
        &self.limits
    }

    /// Sends one file and its closing status message.
    ///
    /// Chunk-level failures end the transfer with status 500 but are never
    /// returned as errors. If the session is not connected when a chunk is
    /// ready, that chunk is dropped and numbering still advances.
    pub async fn transfer<R>(&self, session: &Session, request: TransferRequest<R>) -> TransferOutcome
    where
        R: AsyncRead + Unpin,
    {
        // Sizing: once per transfer, assuming worst-case expansion.
        let compression = Compression::from_flag(request.compress);
        let chunk_size = self.limits.chunk_size(compression);
        let session_id = uuid::Uuid::new_v4().to_string();
        let ctx = TransferContext {
            session_id: &session_id,
            destination: &request.destination,
            compression,
            budget: self.limits.content_budget(),
        };

        info!(
            id = %session_id,
            source = %request.source_name,
            destination = %request.destination,
            compression = %compression,
            chunk_size,
            "starting transfer"
        );

        let mut reader = ChunkReader::new(request.source, chunk_size);
        let mut progress = Progress::default();
        let (status, message) = match stream(session, &ctx, &mut reader, &mut progress).await {
            Ok(()) => (TransferStatus::Completed, MSG_COMPLETED.to_string()),
            Err(e) => {
                let status = e.status();
                let message = e.status_message();
                error!(id = %session_id, error = %e, "{message}");
                (status, message)
            }
        };

        // Closing: exactly one status message.
        let size_kb = size_in_kb(progress.bytes);
        let report = StatusReport {
            filename: request.source_name,
            filepath: request.destination.clone(),
            status: status.code(),
            message,
            size: size_kb,
        };
        let header = StatusHeader {
            id: session_id.clone(),
            filepath: request.destination,
            totals: FinalPart {
                max_part: progress.parts,
                compression,
            },
        };
        let status_delivered = send_status(session, &header, &report).await;

        info!(
            id = %session_id,
            status = report.status,
            parts = progress.parts,
            sent = progress.sent,
            skipped = progress.skipped,
            size_kb,
            "transfer finished"
        );

        TransferOutcome {
            session_id,
            status,
            message: report.message,
            parts: progress.parts,
            parts_sent: progress.sent,
            parts_skipped: progress.skipped,
            bytes_read: progress.bytes,
            size_kb,
            chunk_size,
            status_delivered,
        }
    }

    /// Runs transfers one after another on the same session.
    ///
    /// A failed transfer does not stop the batch.
    pub async fn send_batch<R, I>(&self, session: &Session, requests: I) -> Vec<TransferOutcome>
    where
        R: AsyncRead + Unpin,
        I: IntoIterator<Item = TransferRequest<R>>,
    {
        let mut outcomes = Vec::new();
        for request in requests {
            outcomes.push(self.transfer(session, request).await);
        }
        outcomes
    }
}

/// Sends one file with the default limits.
pub async fn transfer<R>(session: &Session, request: TransferRequest<R>) -> TransferOutcome
where
    R: AsyncRead + Unpin,
{
    TransferEngine::default().transfer(session, request).await
}

/// Sends a batch of files with the default limits.
pub async fn send_batch<R, I>(session: &Session, requests: I) -> Vec<TransferOutcome>
where
    R: AsyncRead + Unpin,
    I: IntoIterator<Item = TransferRequest<R>>,
{
    TransferEngine::default().send_batch(session, requests).await
}

/// Streaming: encode, check, frame and send each window in order.
///
/// One window of lookahead tells whether the current chunk is the last,
/// so only the last chunk carries `maxPart` and `compression`.
async fn stream<R>(
    session: &Session,
    ctx: &TransferContext<'_>,
    reader: &mut ChunkReader<R>,
    progress: &mut Progress,
) -> Result<(), TransferError>
where
    R: AsyncRead + Unpin,
{
    let mut current = reader.next_window().await?;

    while let Some(window) = current {
        progress.bytes += window.len() as u64;
        let part = progress.parts + 1;

        let data = encode_chunk(&window, ctx.compression).map_err(TransferError::Encode)?;
        if data.len() > ctx.budget {
            return Err(TransferError::ChunkTooLarge {
                part,
                encoded_len: data.len(),
                limit: ctx.budget,
            });
        }
        drop(window);

        let next = reader.next_window().await?;
        let last = next.is_none().then_some(FinalPart {
            max_part: part,
            compression: ctx.compression,
        });
        let header = ChunkHeader {
            id: ctx.session_id.to_string(),
            filepath: ctx.destination.to_string(),
            part,
            last,
        };
        let msg = Message::chunk(&header, &ChunkBody { data })?;

        // TODO: fail fast instead of dropping the chunk; a receiver cannot
        // tell a skipped part from a lost one.
        if session.is_connected() {
            debug!(id = %ctx.session_id, part, bytes = msg.body_len(), "sending chunk");
            session.send(msg).await?;
            progress.sent += 1;
        } else {
            warn!(id = %ctx.session_id, part, "session not connected, chunk dropped");
            progress.skipped += 1;
        }
        progress.parts = part;

        current = next;
    }

    Ok(())
}

/// Sends the closing status message. Returns whether it was accepted.
async fn send_status(session: &Session, header: &StatusHeader, report: &StatusReport) -> bool {
    let msg = match Message::status(header, report) {
        Ok(m) => m,
        Err(e) => {
            error!(id = %header.id, error = %e, "failed to build status message");
            return false;
        }
    };
    match session.send(msg).await {
        Ok(()) => {
            debug!(id = %header.id, "sent status message");
            true
        }
        Err(e) => {
            error!(id = %header.id, error = %e, "failed to send status message");
            false
        }
    }
}
