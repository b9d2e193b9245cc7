//! Record Log Codec
//!
//! The store persists every write as a record appended to `sophia.log`.
//!
//! ## Record Format
//!
//! ```text
//! ┌────────┬───────────┬───────────┬───────────┬───────┬───────┬──────────┐
//! │ op: u8 │ klen: u32 │ vlen: u32 │ hcrc: u32 │ key   │ value │ crc: u32 │
//! └────────┴───────────┴───────────┴───────────┴───────┴───────┴──────────┘
//! ```
//!
//! Integers are little-endian. `hcrc` covers `op`, `klen` and `vlen`; `crc`
//! covers every byte before it. A delete record carries `vlen = 0` and no
//! value bytes.
//!
//! Only the final record may be incomplete. A header that is cut short, or
//! one that verifies but whose body runs past the end of the log, is a torn
//! write. Any other damage is corruption.

use super::error::{StoreError, StoreResult};
use bytes::{Buf, BufMut, Bytes};
use std::collections::BTreeMap;
use tracing::warn;

/// Record log file name inside the database directory.
pub const LOG_FILE: &str = "sophia.log";

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// op + key length + value length
const FIELDS_LEN: usize = 1 + 4 + 4;
/// fields + header checksum
const HEADER_LEN: usize = FIELDS_LEN + 4;
const CRC_LEN: usize = 4;

/// A single logged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Put(Bytes, Bytes),
    Delete(Bytes),
}

impl Record {
    /// Appends the encoded record to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        let (op, key, value): (u8, &[u8], &[u8]) = match self {
            Record::Put(key, value) => (OP_PUT, &key[..], &value[..]),
            Record::Delete(key) => (OP_DELETE, &key[..], &[][..]),
        };

        buf.put_u8(op);
        buf.put_u32_le(key.len() as u32);
        buf.put_u32_le(value.len() as u32);
        let header_crc = crc32fast::hash(&buf[start..]);
        buf.put_u32_le(header_crc);
        buf.put_slice(key);
        buf.put_slice(value);

        let crc = crc32fast::hash(&buf[start..]);
        buf.put_u32_le(crc);
    }
}

/// The result of replaying a log into memory.
#[derive(Debug, Default)]
pub struct Replay {
    /// Live entries in key order
    pub entries: BTreeMap<Bytes, Bytes>,
    /// Number of complete records read
    pub records: u64,
    /// Records superseded by a later put or delete
    pub dead: u64,
    /// Length of the valid prefix; anything after it is a torn write
    pub valid_len: usize,
}

fn corrupted(offset: usize, reason: impl std::fmt::Display) -> StoreError {
    StoreError::OpenFailed(format!("corrupted record at offset {}: {}", offset, reason))
}

/// Replays an entire log image.
///
/// A truncated trailing record is ignored. A checksum mismatch or an unknown
/// op code anywhere is reported as corruption.
pub fn replay(data: &[u8]) -> StoreResult<Replay> {
    let mut out = Replay::default();
    let mut offset = 0usize;

    while offset < data.len() {
        let rest = &data[offset..];
        if rest.len() < HEADER_LEN {
            warn!(offset, "Ignoring truncated record header at end of log");
            break;
        }

        let mut header = &rest[..HEADER_LEN];
        let op = header.get_u8();
        let klen = header.get_u32_le() as usize;
        let vlen = header.get_u32_le() as usize;
        let header_crc = header.get_u32_le();
        if crc32fast::hash(&rest[..FIELDS_LEN]) != header_crc {
            return Err(corrupted(offset, "header checksum mismatch"));
        }
        if op != OP_PUT && op != OP_DELETE {
            return Err(corrupted(offset, format_args!("unknown op {:#04x}", op)));
        }
        if op == OP_DELETE && vlen != 0 {
            return Err(corrupted(offset, "delete record carries a value"));
        }

        let body_len = HEADER_LEN + klen + vlen;
        if rest.len() < body_len + CRC_LEN {
            warn!(offset, "Ignoring truncated record at end of log");
            break;
        }

        let mut crc_bytes = &rest[body_len..body_len + CRC_LEN];
        let stored_crc = crc_bytes.get_u32_le();
        if crc32fast::hash(&rest[..body_len]) != stored_crc {
            return Err(corrupted(offset, "checksum mismatch"));
        }

        let key = Bytes::copy_from_slice(&rest[HEADER_LEN..HEADER_LEN + klen]);
        if op == OP_PUT {
            let value = Bytes::copy_from_slice(&rest[HEADER_LEN + klen..body_len]);
            if out.entries.insert(key, value).is_some() {
                out.dead += 1;
            }
        } else {
            // the delete record itself is dead weight too
            out.dead += 1;
            if out.entries.remove(&key).is_some() {
                out.dead += 1;
            }
        }

        out.records += 1;
        offset += body_len + CRC_LEN;
        out.valid_len = offset;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all(records: &[Record]) -> Vec<u8> {
        let mut buf = Vec::new();
        for record in records {
            record.encode(&mut buf);
        }
        buf
    }

    #[test]
    fn test_replay_keeps_latest_value() {
        let data = encode_all(&[
            Record::Put(Bytes::from("b"), Bytes::from("1")),
            Record::Put(Bytes::from("a"), Bytes::from("2")),
            Record::Put(Bytes::from("b"), Bytes::from("3")),
        ]);

        let replay = replay(&data).unwrap();
        assert_eq!(replay.records, 3);
        assert_eq!(replay.dead, 1);
        assert_eq!(replay.valid_len, data.len());

        let keys: Vec<_> = replay.entries.keys().cloned().collect();
        assert_eq!(keys, vec![Bytes::from("a"), Bytes::from("b")]);
        assert_eq!(replay.entries[&Bytes::from("b")], Bytes::from("3"));
    }

    #[test]
    fn test_replay_delete() {
        let data = encode_all(&[
            Record::Put(Bytes::from("a"), Bytes::from("1")),
            Record::Delete(Bytes::from("a")),
        ]);

        let replay = replay(&data).unwrap();
        assert!(replay.entries.is_empty());
        assert_eq!(replay.dead, 2);
    }

    #[test]
    fn test_replay_ignores_torn_tail() {
        let mut data = encode_all(&[Record::Put(Bytes::from("a"), Bytes::from("1"))]);
        let complete = data.len();
        Record::Put(Bytes::from("b"), Bytes::from("2")).encode(&mut data);
        data.truncate(data.len() - 3);

        let replay = replay(&data).unwrap();
        assert_eq!(replay.entries.len(), 1);
        assert_eq!(replay.valid_len, complete);
    }

    #[test]
    fn test_replay_detects_corruption() {
        let mut data = encode_all(&[Record::Put(Bytes::from("key"), Bytes::from("value"))]);
        data[HEADER_LEN] ^= 0xff;

        let err = replay(&data).unwrap_err();
        assert!(matches!(err, StoreError::OpenFailed(msg) if msg.contains("checksum")));
    }

    #[test]
    fn test_replay_corrupted_length_fails() {
        let mut data = encode_all(&[
            Record::Put(Bytes::from("a"), Bytes::from("1")),
            Record::Put(Bytes::from("b"), Bytes::from("2")),
            Record::Put(Bytes::from("c"), Bytes::from("3")),
        ]);
        data[1..5].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

        let err = replay(&data).unwrap_err();
        assert!(
            matches!(&err, StoreError::OpenFailed(msg) if msg.contains("offset 0") && msg.contains("header"))
        );
    }

    #[test]
    fn test_replay_corrupted_middle_length_fails() {
        let first = encode_all(&[Record::Put(Bytes::from("a"), Bytes::from("1"))]);
        let mut data = first.clone();
        Record::Put(Bytes::from("b"), Bytes::from("2")).encode(&mut data);
        Record::Put(Bytes::from("c"), Bytes::from("3")).encode(&mut data);
        data[first.len() + 5] ^= 0x40;

        let err = replay(&data).unwrap_err();
        let expected = format!("offset {}", first.len());
        assert!(matches!(&err, StoreError::OpenFailed(msg) if msg.contains(&expected)));
    }

    #[test]
    fn test_replay_unknown_op_fails() {
        let mut data = Vec::new();
        data.put_u8(9);
        data.put_u32_le(1);
        data.put_u32_le(0);
        let header_crc = crc32fast::hash(&data);
        data.put_u32_le(header_crc);
        data.put_u8(b'a');
        let crc = crc32fast::hash(&data);
        data.put_u32_le(crc);

        let err = replay(&data).unwrap_err();
        assert!(matches!(&err, StoreError::OpenFailed(msg) if msg.contains("unknown op")));
    }

    #[test]
    fn test_replay_empty() {
        let replay = replay(&[]).unwrap();
        assert!(replay.entries.is_empty());
        assert_eq!(replay.records, 0);
        assert_eq!(replay.valid_len, 0);
    }
}
