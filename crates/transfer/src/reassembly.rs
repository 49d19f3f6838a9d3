//! Receiver-side reassembly of multipart message sets.
//!
//! Parts may arrive in any order and interleaved across transfers. A file
//! is complete once its status message reports success and every part
//! `1..=maxPart` has been seen. Sets that stall (a lost status message, or
//! a part the sender skipped) are dropped by [`Reassembler::evict_expired`].

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use hubdrop_protocol::{
    ChunkHeader, Compression, FinalPart, Message, MultipartMessage, ProtocolError, StatusHeader,
    StatusReport,
};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::codec::{DecodeError, decode_chunk};

#[derive(Debug, thiserror::Error)]
pub enum ReassemblyError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("transfer {id}: part {part} received twice")]
    DuplicatePart { id: String, part: u32 },

    #[error("transfer {id}: part {part} is beyond maxPart {max_part}")]
    PartOutOfRange { id: String, part: u32, max_part: u32 },

    #[error("transfer {id}: part {part}: {source}")]
    Decode {
        id: String,
        part: u32,
        #[source]
        source: DecodeError,
    },

    #[error("transfer {id} failed on the sender ({status}): {message}")]
    TransferFailed {
        id: String,
        status: u16,
        message: String,
    },

    #[error("transfer {id}: conflicting totals {first:?} and {second:?}")]
    MismatchedTotals {
        id: String,
        first: FinalPart,
        second: FinalPart,
    },
}

/// A fully received file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassembledFile {
    pub id: String,
    pub filepath: String,
    pub compression: Compression,
    pub parts: u32,
    pub data: Vec<u8>,
    pub report: StatusReport,
}

/// How long an incomplete set is kept after its last message.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug)]
struct Pending {
    filepath: String,
    parts: BTreeMap<u32, String>,
    totals: Option<FinalPart>,
    report: Option<StatusReport>,
    last_seen: Instant,
}

impl Pending {
    fn new() -> Self {
        Self {
            filepath: String::new(),
            parts: BTreeMap::new(),
            totals: None,
            report: None,
            last_seen: Instant::now(),
        }
    }
}

/// Collects chunks per transfer id until each set is complete.
#[derive(Debug, Default)]
pub struct Reassembler {
    pending: HashMap<String, Pending>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one received message.
    ///
    /// Returns the file when this message completes its set. A failed
    /// status report discards whatever was collected for that transfer.
    pub fn accept(&mut self, msg: &Message) -> Result<Option<ReassembledFile>, ReassemblyError> {
        let id = match MultipartMessage::parse(msg)? {
            MultipartMessage::Chunk { header, body } => {
                let id = header.id.clone();
                self.add_chunk(header, body.data)?;
                id
            }
            MultipartMessage::Status { header, report } => {
                let id = header.id.clone();
                self.add_status(header, report)?;
                id
            }
        };
        self.try_complete(&id)
    }

    /// Number of transfers still waiting for parts or a status.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drops every incomplete set with no message for longer than
    /// `max_age`. Returns the evicted transfer ids.
    pub fn evict_expired(&mut self, max_age: Duration) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.last_seen) > max_age)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            if let Some(p) = self.pending.remove(id) {
                warn!(
                    id = %id,
                    filepath = %p.filepath,
                    parts = p.parts.len(),
                    has_status = p.report.is_some(),
                    "evicting incomplete transfer"
                );
            }
        }
        expired
    }

    fn add_chunk(&mut self, header: ChunkHeader, data: String) -> Result<(), ReassemblyError> {
        let entry = self
            .pending
            .entry(header.id.clone())
            .or_insert_with(Pending::new);
        entry.last_seen = Instant::now();
        if entry.filepath.is_empty() {
            entry.filepath = header.filepath;
        }
        if entry.parts.contains_key(&header.part) {
            return Err(ReassemblyError::DuplicatePart {
                id: header.id,
                part: header.part,
            });
        }
        if let Some(last) = header.last {
            merge_totals(&header.id, &mut entry.totals, last)?;
        }
        if let Some(totals) = entry.totals
            && header.part > totals.max_part
        {
            return Err(ReassemblyError::PartOutOfRange {
                id: header.id,
                part: header.part,
                max_part: totals.max_part,
            });
        }
        debug!(id = %header.id, part = header.part, "received chunk");
        entry.parts.insert(header.part, data);
        Ok(())
    }

    fn add_status(
        &mut self,
        header: StatusHeader,
        report: StatusReport,
    ) -> Result<(), ReassemblyError> {
        if !report.is_success() {
            self.pending.remove(&header.id);
            warn!(id = %header.id, status = report.status, message = %report.message, "transfer failed on sender");
            return Err(ReassemblyError::TransferFailed {
                id: header.id,
                status: report.status,
                message: report.message,
            });
        }

        let entry = self
            .pending
            .entry(header.id.clone())
            .or_insert_with(Pending::new);
        entry.last_seen = Instant::now();
        if entry.filepath.is_empty() {
            entry.filepath = header.filepath;
        }
        merge_totals(&header.id, &mut entry.totals, header.totals)?;
        if let Some((&part, _)) = entry.parts.last_key_value()
            && part > header.totals.max_part
        {
            return Err(ReassemblyError::PartOutOfRange {
                id: header.id,
                part,
                max_part: header.totals.max_part,
            });
        }
        entry.report = Some(report);
        Ok(())
    }

    fn try_complete(&mut self, id: &str) -> Result<Option<ReassembledFile>, ReassemblyError> {
        let ready = self.pending.get(id).is_some_and(|p| {
            p.report.is_some()
                && p.totals
                    .is_some_and(|t| p.parts.len() == t.max_part as usize)
        });
        if !ready {
            return Ok(None);
        }
        let Some(Pending {
            filepath,
            parts,
            totals: Some(totals),
            report: Some(report),
            ..
        }) = self.pending.remove(id)
        else {
            return Ok(None);
        };

        let mut data = Vec::new();
        for (part, encoded) in parts {
            let bytes = decode_chunk(&encoded, totals.compression).map_err(|source| {
                ReassemblyError::Decode {
                    id: id.to_string(),
                    part,
                    source,
                }
            })?;
            data.extend_from_slice(&bytes);
        }

        debug!(id, parts = totals.max_part, bytes = data.len(), "reassembled file");
        Ok(Some(ReassembledFile {
            id: id.to_string(),
            filepath,
            compression: totals.compression,
            parts: totals.max_part,
            data,
            report,
        }))
    }
}

fn merge_totals(
    id: &str,
    current: &mut Option<FinalPart>,
    incoming: FinalPart,
) -> Result<(), ReassemblyError> {
    match current {
        Some(existing) if *existing != incoming => Err(ReassemblyError::MismatchedTotals {
            id: id.to_string(),
            first: *existing,
            second: incoming,
        }),
        _ => {
            *current = Some(incoming);
            Ok(())
        }
    }
}
