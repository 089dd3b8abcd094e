//! Record framing for the on-disk note log.
//!
//! Each record is framed as:
//!
//! ```text
//! | magic "NSLG" (4) | version u16 LE | kind u8 | len u32 LE | payload (len) | crc32 u32 LE |
//! ```
//!
//! The CRC covers everything from the magic through the payload. Payloads are
//! CBOR: a full [`Note`] for `Put`, the `local_id` string for `Remove`.

use crate::error::{StorageError, StorageResult};
use notesync_protocol::{decode_cbor, encode_cbor, Note};

/// Magic bytes identifying a log record.
pub(crate) const LOG_MAGIC: [u8; 4] = *b"NSLG";

/// Current log format version.
pub(crate) const LOG_VERSION: u16 = 1;

/// magic + version + kind + len
const HEADER_SIZE: usize = 4 + 2 + 1 + 4;
const CRC_SIZE: usize = 4;

const KIND_PUT: u8 = 1;
const KIND_REMOVE: u8 = 2;

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogRecord {
    /// Insert or replace a note.
    Put(Note),
    /// Remove a note by local id.
    Remove(String),
}

impl LogRecord {
    /// Serializes the record into a framed byte buffer.
    pub(crate) fn encode(&self) -> StorageResult<Vec<u8>> {
        let (kind, payload) = match self {
            LogRecord::Put(note) => (KIND_PUT, encode_cbor(note)?),
            LogRecord::Remove(local_id) => (KIND_REMOVE, encode_cbor(local_id)?),
        };

        let len = u32::try_from(payload.len()).map_err(|_| {
            StorageError::Corrupted(format!("record payload too large: {} bytes", payload.len()))
        })?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        frame.extend_from_slice(&LOG_MAGIC);
        frame.extend_from_slice(&LOG_VERSION.to_le_bytes());
        frame.push(kind);
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let crc = compute_crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }
}

/// Result of scanning a log buffer.
#[derive(Debug)]
pub(crate) struct LogScan {
    /// Records decoded from the valid prefix.
    pub records: Vec<LogRecord>,
    /// Length of the valid prefix in bytes.
    pub valid_len: u64,
    /// Why scanning stopped early, if it did.
    pub stopped: Option<String>,
}

/// Decodes records from a buffer until the end or the first bad frame.
///
/// A torn or corrupt frame ends the scan; everything from that frame on is
/// outside `valid_len`.
pub(crate) fn scan(buffer: &[u8]) -> LogScan {
    let mut records = Vec::new();
    let mut offset = 0usize;

    let stopped = loop {
        let remaining = &buffer[offset..];
        if remaining.is_empty() {
            break None;
        }
        match decode_frame(remaining) {
            Ok((record, consumed)) => {
                records.push(record);
                offset += consumed;
            }
            Err(reason) => break Some(format!("offset {offset}: {reason}")),
        }
    };

    LogScan {
        records,
        valid_len: offset as u64,
        stopped,
    }
}

/// Decodes one frame from the front of `bytes`, returning the record and the
/// number of bytes consumed.
fn decode_frame(bytes: &[u8]) -> Result<(LogRecord, usize), String> {
    if bytes.len() < HEADER_SIZE {
        return Err(format!("truncated header ({} bytes)", bytes.len()));
    }
    if bytes[0..4] != LOG_MAGIC {
        return Err("bad magic".into());
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != LOG_VERSION {
        return Err(format!("unsupported log version {version}"));
    }
    let kind = bytes[6];
    let len = u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]) as usize;

    let payload_end = HEADER_SIZE + len;
    let frame_end = payload_end + CRC_SIZE;
    if bytes.len() < frame_end {
        return Err(format!("truncated record (need {frame_end}, have {})", bytes.len()));
    }

    let stored_crc = u32::from_le_bytes([
        bytes[payload_end],
        bytes[payload_end + 1],
        bytes[payload_end + 2],
        bytes[payload_end + 3],
    ]);
    let computed_crc = compute_crc32(&bytes[..payload_end]);
    if stored_crc != computed_crc {
        return Err(format!(
            "checksum mismatch: stored {stored_crc:#010x}, computed {computed_crc:#010x}"
        ));
    }

    let payload = &bytes[HEADER_SIZE..payload_end];
    let record = match kind {
        KIND_PUT => LogRecord::Put(decode_cbor(payload).map_err(|e| e.to_string())?),
        KIND_REMOVE => LogRecord::Remove(decode_cbor(payload).map_err(|e| e.to_string())?),
        other => return Err(format!("unknown record kind {other}")),
    };
    Ok((record, frame_end))
}

/// Computes CRC32 checksum for data (IEEE polynomial).
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
