use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::constants::{MULTIPART_CHUNK, MULTIPART_STATUS, STATUS_OK, property};
use crate::envelope::Message;
use crate::types::Compression;

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// JSON body of a chunk message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkBody {
    /// Base64 text of the (possibly compressed) chunk bytes.
    pub data: String,
}

/// JSON body of the terminal status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Local identifying path of the source.
    pub filename: String,
    /// Destination path on the receiver.
    pub filepath: String,
    /// 200 on clean completion, 500 on any failure.
    pub status: u16,
    pub message: String,
    /// Bytes read from the source, rounded up to whole kilobytes.
    pub size: u64,
}

impl StatusReport {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

// ---------------------------------------------------------------------------
// Headers (custom properties)
// ---------------------------------------------------------------------------

/// Set-level metadata carried only by the last message(s) of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalPart {
    pub max_part: u32,
    pub compression: Compression,
}

/// Properties of one chunk message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: String,
    pub filepath: String,
    pub part: u32,
    /// Present on the last chunk only.
    pub last: Option<FinalPart>,
}

/// Properties of the closing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHeader {
    pub id: String,
    pub filepath: String,
    pub totals: FinalPart,
}

impl Message {
    /// Builds a chunk message with its multipart properties.
    pub fn chunk(header: &ChunkHeader, body: &ChunkBody) -> Result<Self, serde_json::Error> {
        let mut msg = Message::json(body)?
            .with_property(property::MULTIPART, MULTIPART_CHUNK)
            .with_property(property::ID, header.id.as_str())
            .with_property(property::FILEPATH, header.filepath.as_str())
            .with_property(property::PART, header.part.to_string());
        if let Some(last) = header.last {
            msg.set_property(property::MAX_PART, last.max_part.to_string());
            msg.set_property(property::COMPRESSION, last.compression.as_str());
        }
        Ok(msg)
    }

    /// Builds the terminal status message. It carries no `part` property.
    pub fn status(header: &StatusHeader, report: &StatusReport) -> Result<Self, serde_json::Error> {
        Ok(Message::json(report)?
            .with_property(property::MULTIPART, MULTIPART_STATUS)
            .with_property(property::ID, header.id.as_str())
            .with_property(property::FILEPATH, header.filepath.as_str())
            .with_property(property::MAX_PART, header.totals.max_part.to_string())
            .with_property(property::COMPRESSION, header.totals.compression.as_str()))
    }
}

/// A message classified by its multipart properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartMessage {
    Chunk { header: ChunkHeader, body: ChunkBody },
    Status { header: StatusHeader, report: StatusReport },
}

impl MultipartMessage {
    /// Classifies and parses a received message.
    pub fn parse(msg: &Message) -> Result<Self, ProtocolError> {
        let kind = msg.require_property(property::MULTIPART)?;
        let id = msg.require_property(property::ID)?.to_string();
        let filepath = msg.require_property(property::FILEPATH)?.to_string();

        match kind {
            MULTIPART_CHUNK => {
                let part = parse_number(msg, property::PART)?;
                if part == 0 {
                    return Err(invalid(property::PART, "0"));
                }
                let last = match msg.property(property::MAX_PART) {
                    Some(_) => Some(parse_totals(msg)?),
                    None => None,
                };
                Ok(Self::Chunk {
                    header: ChunkHeader {
                        id,
                        filepath,
                        part,
                        last,
                    },
                    body: msg.parse_body()?,
                })
            }
            MULTIPART_STATUS => Ok(Self::Status {
                header: StatusHeader {
                    id,
                    filepath,
                    totals: parse_totals(msg)?,
                },
                report: msg.parse_body()?,
            }),
            other => Err(invalid(property::MULTIPART, other)),
        }
    }

    /// Transfer session identifier.
    pub fn id(&self) -> &str {
        match self {
            Self::Chunk { header, .. } => &header.id,
            Self::Status { header, .. } => &header.id,
        }
    }
}

fn parse_totals(msg: &Message) -> Result<FinalPart, ProtocolError> {
    Ok(FinalPart {
        max_part: parse_number(msg, property::MAX_PART)?,
        compression: msg.require_property(property::COMPRESSION)?.parse()?,
    })
}

fn parse_number(msg: &Message, key: &str) -> Result<u32, ProtocolError> {
    let raw = msg.require_property(key)?;
    raw.parse().map_err(|_| invalid(key, raw))
}

fn invalid(key: &str, value: &str) -> ProtocolError {
    ProtocolError::InvalidProperty {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(part: u32, last: Option<FinalPart>) -> ChunkHeader {
        ChunkHeader {
            id: "6f1c".into(),
            filepath: "myDevice/pdf/doc.pdf".into(),
            part,
            last,
        }
    }

    #[test]
    fn middle_chunk_properties() {
        let body = ChunkBody { data: "AAAA".into() };
        let msg = Message::chunk(&header(2, None), &body).unwrap();

        assert_eq!(msg.body, r#"{"data":"AAAA"}"#);
        assert_eq!(msg.property("multipart-message"), Some("yes"));
        assert_eq!(msg.property("id"), Some("6f1c"));
        assert_eq!(msg.property("filepath"), Some("myDevice/pdf/doc.pdf"));
        assert_eq!(msg.property("part"), Some("2"));
        assert!(msg.property("maxPart").is_none());
        assert!(msg.property("compression").is_none());
    }

    #[test]
    fn last_chunk_carries_totals() {
        let last = FinalPart {
            max_part: 3,
            compression: Compression::Deflate,
        };
        let body = ChunkBody { data: String::new() };
        let msg = Message::chunk(&header(3, Some(last)), &body).unwrap();
        assert_eq!(msg.property("maxPart"), Some("3"));
        assert_eq!(msg.property("compression"), Some("deflate"));
    }

    #[test]
    fn status_message_has_no_part() {
        let report = StatusReport {
            filename: "./video.mp4".into(),
            filepath: "myDevice/video/video.mp4".into(),
            status: 200,
            message: "completed".into(),
            size: 12,
        };
        let head = StatusHeader {
            id: "6f1c".into(),
            filepath: report.filepath.clone(),
            totals: FinalPart {
                max_part: 1,
                compression: Compression::None,
            },
        };
        let msg = Message::status(&head, &report).unwrap();
        assert_eq!(msg.property("multipart-message"), Some("status"));
        assert!(msg.property("part").is_none());
        assert_eq!(msg.property("maxPart"), Some("1"));
        assert_eq!(msg.content_type.as_deref(), Some("application/json"));

        let parsed = MultipartMessage::parse(&msg).unwrap();
        assert_eq!(
            parsed,
            MultipartMessage::Status {
                header: head,
                report
            }
        );
    }

    #[test]
    fn parse_chunk_roundtrip() {
        let body = ChunkBody { data: "QUJD".into() };
        let h = header(
            1,
            Some(FinalPart {
                max_part: 1,
                compression: Compression::None,
            }),
        );
        let msg = Message::chunk(&h, &body).unwrap();
        match MultipartMessage::parse(&msg).unwrap() {
            MultipartMessage::Chunk { header, body: b } => {
                assert_eq!(header, h);
                assert_eq!(b, body);
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_zero_part() {
        let body = ChunkBody { data: String::new() };
        let mut msg = Message::chunk(&header(1, None), &body).unwrap();
        msg.set_property("part", "0");
        assert!(matches!(
            MultipartMessage::parse(&msg),
            Err(ProtocolError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn parse_rejects_non_numeric_part() {
        let body = ChunkBody { data: String::new() };
        let mut msg = Message::chunk(&header(1, None), &body).unwrap();
        msg.set_property("part", "one");
        let err = MultipartMessage::parse(&msg).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidProperty { key, .. } if key == "part"));
    }

    #[test]
    fn parse_requires_multipart_marker() {
        let msg = Message::json(&ChunkBody { data: String::new() }).unwrap();
        assert!(matches!(
            MultipartMessage::parse(&msg),
            Err(ProtocolError::MissingProperty(k)) if k == "multipart-message"
        ));
    }

    #[test]
    fn status_report_success_flag() {
        let mut report = StatusReport {
            filename: String::new(),
            filepath: String::new(),
            status: 500,
            message: String::new(),
            size: 0,
        };
        assert!(!report.is_success());
        report.status = 200;
        assert!(report.is_success());
    }
}
