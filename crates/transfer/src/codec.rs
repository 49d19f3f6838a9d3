//! Per-chunk compression and text-safe encoding.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression as Level;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use hubdrop_protocol::Compression;

/// Errors produced while decoding a received chunk.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("inflate failed: {0}")]
    Inflate(#[from] std::io::Error),
}

/// Compresses (if requested) and base64-encodes one raw chunk.
pub fn encode_chunk(raw: &[u8], compression: Compression) -> std::io::Result<String> {
    match compression {
        Compression::None => Ok(STANDARD.encode(raw)),
        Compression::Deflate => Ok(STANDARD.encode(deflate(raw)?)),
    }
}

/// Reverses [`encode_chunk`].
pub fn decode_chunk(data: &str, compression: Compression) -> Result<Vec<u8>, DecodeError> {
    let bytes = STANDARD.decode(data)?;
    match compression {
        Compression::None => Ok(bytes),
        Compression::Deflate => Ok(inflate(&bytes)?),
    }
}

/// Zlib-framed deflate at the default level.
fn deflate(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2 + 64), Level::default());
    encoder.write_all(raw)?;
    encoder.finish()
}

fn inflate(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(compressed).read_to_end(&mut out)?;
    Ok(out)
}
