use tokio::io::{AsyncRead, AsyncReadExt};

use crate::TransferError;

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a byte source in fixed-size raw windows.
///
/// Only one window is resident per call; the last window may be shorter.
pub struct ChunkReader<R> {
    source: R,
    chunk_size: usize,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Wraps `source`. A `chunk_size` of 0 is treated as 1.
    pub fn new(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Reads the next window. Returns `None` at EOF.
    ///
    /// Short reads from the source are retried until the window is full
    /// or the source is exhausted.
    pub async fn next_window(&mut self) -> Result<Option<Vec<u8>>, TransferError> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }

    /// Window size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
