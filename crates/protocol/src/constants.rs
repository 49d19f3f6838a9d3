/// Hard per-message budget of the transport, in bytes (255 KB).
pub const MAX_MESSAGE_SIZE: usize = 255 * 1024;

/// Chunk body with an empty `data` field, exactly as `serde_json` writes it.
///
/// Its length is the framing overhead subtracted from [`MAX_MESSAGE_SIZE`]
/// before sizing the encoded data field.
pub const CHUNK_BODY_TEMPLATE: &str = r#"{"data":""}"#;

/// Raw bytes per encoded byte for base64 (the inverse of the 4/3 expansion).
pub const BASE64_RAW_PER_ENCODED: f64 = 0.75;

/// Content type set on every message this protocol emits.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content encoding set on every message this protocol emits.
pub const CONTENT_ENCODING_UTF8: &str = "utf-8";

/// Custom message property keys.
pub mod property {
    /// Marks membership in a multipart set.
    pub const MULTIPART: &str = "multipart-message";
    /// Transfer session identifier shared by every message of one file.
    pub const ID: &str = "id";
    /// Destination path, forwarded verbatim to the receiver.
    pub const FILEPATH: &str = "filepath";
    /// 1-based ordinal of a chunk.
    pub const PART: &str = "part";
    /// Total number of parts; only on the last chunk and the status message.
    pub const MAX_PART: &str = "maxPart";
    /// Compression tag; only on the last chunk and the status message.
    pub const COMPRESSION: &str = "compression";
}

/// `multipart-message` value carried by chunk messages.
pub const MULTIPART_CHUNK: &str = "yes";

/// `multipart-message` value carried by the closing status message.
pub const MULTIPART_STATUS: &str = "status";

/// Status code reported when a transfer completed cleanly.
pub const STATUS_OK: u16 = 200;

/// Status code reported for any failed transfer.
pub const STATUS_FAILED: u16 = 500;

/// Returns the byte budget left for the encoded `data` field of a chunk
/// when messages are capped at `max_message_size`.
pub fn content_budget(max_message_size: usize) -> usize {
    max_message_size.saturating_sub(CHUNK_BODY_TEMPLATE.len())
}
