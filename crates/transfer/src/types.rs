use std::path::Path;

use hubdrop_protocol::Compression;
use hubdrop_protocol::constants::{
    BASE64_RAW_PER_ENCODED, CHUNK_BODY_TEMPLATE, MAX_MESSAGE_SIZE, STATUS_FAILED, STATUS_OK,
    content_budget,
};

/// Largest per-message cap accepted by [`TransferLimits::validate`].
pub const MAX_MESSAGE_SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// Rejected [`TransferLimits`] values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LimitsError {
    #[error("max_message_size {value} outside [{min}, {max}]")]
    MessageSize { value: usize, min: usize, max: usize },

    #[error("compression_margin {0} outside [0, 0.75)")]
    CompressionMargin(f64),
}

/// Message size budget and the compression safety margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferLimits {
    /// Per-message byte cap of the transport.
    pub max_message_size: usize,
    /// Fraction subtracted from the raw-per-encoded ratio when compressing,
    /// covering chunks that deflate cannot shrink but still wraps in
    /// container overhead. Empirical; tune against the codec in use.
    pub compression_margin: f64,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            compression_margin: 0.05,
        }
    }
}

impl TransferLimits {
    /// Checks that the cap leaves room for at least one base64 quantum and
    /// that the margin keeps the compressed multiplier positive.
    pub fn validate(&self) -> Result<(), LimitsError> {
        let min = CHUNK_BODY_TEMPLATE.len() + 4;
        if !(min..=MAX_MESSAGE_SIZE_LIMIT).contains(&self.max_message_size) {
            return Err(LimitsError::MessageSize {
                value: self.max_message_size,
                min,
                max: MAX_MESSAGE_SIZE_LIMIT,
            });
        }
        let m = self.compression_margin;
        if !m.is_finite() || !(0.0..BASE64_RAW_PER_ENCODED).contains(&m) {
            return Err(LimitsError::CompressionMargin(m));
        }
        Ok(())
    }

    /// Bytes available to the encoded `data` field of a chunk.
    pub fn content_budget(&self) -> usize {
        content_budget(self.max_message_size)
    }

    /// Raw bytes read per chunk.
    ///
    /// `floor(budget * multiplier)`, rounded down to a whole number of
    /// base64 quanta (3 bytes) so uncompressed chunks never carry padding
    /// and always fit. Never less than 1 nor more than the content budget.
    pub fn chunk_size(&self, compression: Compression) -> usize {
        let multiplier = if compression.is_compressed() {
            BASE64_RAW_PER_ENCODED - self.compression_margin
        } else {
            BASE64_RAW_PER_ENCODED
        };
        let budget = self.content_budget();
        let raw = (budget as f64 * multiplier).floor();
        if raw.is_nan() || raw < 3.0 {
            return 1;
        }
        let raw = (raw as usize).min(budget);
        raw - raw % 3
    }
}

/// One file to send: a byte source plus where it should land.
pub struct TransferRequest<R> {
    pub source: R,
    /// Local identifying path, echoed back in the status report.
    pub source_name: String,
    /// Destination path, opaque here and forwarded to the receiver.
    pub destination: String,
    pub compress: bool,
}

impl<R> TransferRequest<R> {
    pub fn new(
        source: R,
        source_name: impl Into<String>,
        destination: impl Into<String>,
        compress: bool,
    ) -> Self {
        Self {
            source,
            source_name: source_name.into(),
            destination: destination.into(),
            compress,
        }
    }
}

impl TransferRequest<tokio::fs::File> {
    /// Opens a local file as the byte source.
    pub async fn open(
        path: impl AsRef<Path>,
        destination: impl Into<String>,
        compress: bool,
    ) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(
            file,
            path.to_string_lossy(),
            destination,
            compress,
        ))
    }
}

/// Terminal state of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Source exhausted, every chunk handled.
    Completed,
    /// An encoded chunk exceeded the content budget.
    SizeExceeded,
    /// The transport rejected a send.
    SendFailed,
    /// Reading the source failed.
    ReadFailed,
    /// Compressing a chunk failed.
    EncodeFailed,
}

impl TransferStatus {
    /// Numeric status reported to the receiver.
    pub fn code(self) -> u16 {
        match self {
            Self::Completed => STATUS_OK,
            Self::SizeExceeded | Self::SendFailed | Self::ReadFailed | Self::EncodeFailed => {
                STATUS_FAILED
            }
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Completed
    }
}

/// Record of one finished transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    /// Identifier shared by every message of this transfer.
    pub session_id: String,
    pub status: TransferStatus,
    /// Human-readable status, as sent to the receiver.
    pub message: String,
    /// Parts numbered; equals the `maxPart` announced to the receiver.
    pub parts: u32,
    /// Parts handed to the transport successfully.
    pub parts_sent: u32,
    /// Parts numbered but dropped because the session was not connected.
    pub parts_skipped: u32,
    /// Source bytes processed.
    pub bytes_read: u64,
    /// `bytes_read` rounded up to whole kilobytes.
    pub size_kb: u64,
    /// Raw chunk size used for this transfer.
    pub chunk_size: usize,
    /// Whether the closing status message was accepted by the transport.
    pub status_delivered: bool,
}

/// Rounds a byte count up to whole kilobytes.
pub fn size_in_kb(bytes: u64) -> u64 {
    bytes.div_ceil(1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_sizes() {
        let limits = TransferLimits::default();
        assert_eq!(limits.content_budget(), 261_109);
        assert_eq!(limits.chunk_size(Compression::None), 195_831);
        assert_eq!(limits.chunk_size(Compression::Deflate), 182_775);
    }

    #[test]
    fn uncompressed_chunks_always_fit() {
        for max in [16, 17, 18, 19, 100, 1024, 4096, MAX_MESSAGE_SIZE] {
            let limits = TransferLimits {
                max_message_size: max,
                ..TransferLimits::default()
            };
            let k = limits.chunk_size(Compression::None);
            assert_eq!(k % 3, 0, "max {max}");
            let encoded = k.div_ceil(3) * 4;
            assert!(encoded <= limits.content_budget(), "max {max}: {encoded}");
        }
    }

    #[test]
    fn chunk_size_never_zero() {
        let limits = TransferLimits {
            max_message_size: 12,
            compression_margin: 0.05,
        };
        assert_eq!(limits.chunk_size(Compression::None), 1);
        assert_eq!(limits.chunk_size(Compression::Deflate), 1);
    }

    #[test]
    fn margin_only_applies_when_compressing() {
        let limits = TransferLimits {
            max_message_size: 4096,
            compression_margin: 0.25,
        };
        assert_eq!(limits.chunk_size(Compression::None), 3063);
        assert_eq!(limits.chunk_size(Compression::Deflate), 2040);
    }

    #[test]
    fn default_limits_are_valid() {
        assert_eq!(TransferLimits::default().validate(), Ok(()));
    }

    #[test]
    fn margin_outside_range_rejected() {
        for margin in [-0.1, -1e30, 0.75, 2.0, f64::NAN, f64::INFINITY] {
            let limits = TransferLimits {
                compression_margin: margin,
                ..TransferLimits::default()
            };
            assert!(
                matches!(limits.validate(), Err(LimitsError::CompressionMargin(_))),
                "margin {margin}"
            );
        }
        let edge = TransferLimits {
            compression_margin: 0.0,
            ..TransferLimits::default()
        };
        assert_eq!(edge.validate(), Ok(()));
    }

    #[test]
    fn implausible_message_size_rejected() {
        for max in [0, 14, MAX_MESSAGE_SIZE_LIMIT + 1, usize::MAX] {
            let limits = TransferLimits {
                max_message_size: max,
                ..TransferLimits::default()
            };
            assert!(
                matches!(limits.validate(), Err(LimitsError::MessageSize { .. })),
                "max {max}"
            );
        }
        let smallest = TransferLimits {
            max_message_size: 15,
            ..TransferLimits::default()
        };
        assert_eq!(smallest.validate(), Ok(()));
    }

    #[test]
    fn negative_margin_chunk_size_stays_bounded() {
        let limits = TransferLimits {
            max_message_size: 4096,
            compression_margin: -1e30,
        };
        assert!(limits.chunk_size(Compression::Deflate) <= limits.content_budget());
    }

    #[test]
    fn status_codes() {
        assert_eq!(TransferStatus::Completed.code(), 200);
        assert_eq!(TransferStatus::SizeExceeded.code(), 500);
        assert_eq!(TransferStatus::SendFailed.code(), 500);
        assert_eq!(TransferStatus::ReadFailed.code(), 500);
        assert_eq!(TransferStatus::EncodeFailed.code(), 500);
        assert!(TransferStatus::Completed.is_success());
        assert!(!TransferStatus::SendFailed.is_success());
    }

    #[test]
    fn kb_rounding() {
        assert_eq!(size_in_kb(0), 0);
        assert_eq!(size_in_kb(1), 1);
        assert_eq!(size_in_kb(1024), 1);
        assert_eq!(size_in_kb(1025), 2);
    }

    #[tokio::test]
    async fn open_uses_path_as_source_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");
        std::fs::write(&path, b"x").unwrap();

        let req = TransferRequest::open(&path, "myDevice/video/video.mp4", true)
            .await
            .unwrap();
        assert!(req.source_name.ends_with("video.mp4"));
        assert_eq!(req.destination, "myDevice/video/video.mp4");
        assert!(req.compress);
    }

    #[tokio::test]
    async fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            TransferRequest::open(dir.path().join("nope"), "x", false)
                .await
                .is_err()
        );
    }
}
