//! Journal Writer: append-only ledger command log with checksums
//!
//! Each applied `LedgerCommand` is written as one entry. Files rotate once
//! they pass `max_file_size`; every writer session starts a fresh segment so
//! a torn tail left by a crash never sits in front of new entries.
//!
//! # Binary Format (per entry)
//! ```text
//! [body_len:    u32]
//! [sequence:    u64]
//! [kind:        u8 ]
//! [payload_len: u32][payload: bytes]
//! [checksum:    u32]  // CRC32C over sequence+kind+payload
//! ```

use crc32c::crc32c;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed entry: {0}")]
    Malformed(String),

    #[error("Sequence error: expected {expected}, got {got}")]
    SequenceError { expected: u64, got: u64 },
}

// Sequence + kind + payload length + checksum
const MIN_BODY_LEN: usize = 8 + 1 + 4 + 4;
const MAX_BODY_LEN: usize = 64 * 1024 * 1024;

const FILE_PREFIX: &str = "ledger-";
const FILE_SUFFIX: &str = ".journal";

// ── Journal Entry ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub sequence: u64,
    /// `LedgerCommand::kind` tag
    pub kind: u8,
    /// Bincode-encoded command
    pub payload: Vec<u8>,
    pub checksum: u32,
}

impl JournalEntry {
    pub fn new(sequence: u64, kind: u8, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(sequence, kind, &payload);
        Self {
            sequence,
            kind,
            payload,
            checksum,
        }
    }

    pub fn compute_checksum(sequence: u64, kind: u8, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(9 + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.push(kind);
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == Self::compute_checksum(self.sequence, self.kind, &self.payload)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body_len = (MIN_BODY_LEN + self.payload.len()) as u32;

        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.push(self.kind);
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Decode one entry from the front of `data`.
    ///
    /// Returns `(entry, bytes_consumed)`. The checksum is carried through
    /// unverified; callers decide what a mismatch means.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), JournalError> {
        if data.len() < 4 {
            return Err(JournalError::Malformed("missing length prefix".into()));
        }
        let body_len = le_u32(&data[0..4]) as usize;
        if !(MIN_BODY_LEN..=MAX_BODY_LEN).contains(&body_len) {
            return Err(JournalError::Malformed(format!(
                "implausible body length {body_len}"
            )));
        }
        let total = 4 + body_len;
        if data.len() < total {
            return Err(JournalError::Malformed(format!(
                "incomplete entry: need {} bytes, have {}",
                total,
                data.len()
            )));
        }

        let body = &data[4..total];
        let sequence = le_u64(&body[0..8]);
        let kind = body[8];
        let payload_len = le_u32(&body[9..13]) as usize;
        if 13 + payload_len + 4 != body.len() {
            return Err(JournalError::Malformed(format!(
                "payload length {} does not fit body of {} bytes",
                payload_len,
                body.len()
            )));
        }
        let payload = body[13..13 + payload_len].to_vec();
        let checksum = le_u32(&body[13 + payload_len..]);

        Ok((
            Self {
                sequence,
                kind,
                payload,
                checksum,
            },
            total,
        ))
    }
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn le_u64(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

// ── Fsync Policy ────────────────────────────────────────────────────

/// Controls when `fsync` is called. Buffered bytes are always handed to the
/// OS after each append.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    EveryWrite,
    EveryN(usize),
    /// Only on explicit `sync()` and on rotation
    OnSync,
}

// ── Journal Writer Configuration ────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JournalConfig {
    pub dir: PathBuf,
    /// Rotate once the current file reaches this many bytes (default 64 MiB)
    pub max_file_size: u64,
    pub fsync_policy: FsyncPolicy,
}

impl JournalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_file_size: 64 * 1024 * 1024,
            fsync_policy: FsyncPolicy::OnSync,
        }
    }
}

// ── Journal Writer ──────────────────────────────────────────────────

pub struct JournalWriter {
    config: JournalConfig,
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_file_size: u64,
    file_index: u64,
    next_sequence: u64,
    writes_since_fsync: usize,
}

impl JournalWriter {
    /// Open a new segment after any existing ones; the first entry written
    /// must carry `next_sequence`.
    pub fn open(config: JournalConfig, next_sequence: u64) -> Result<Self, JournalError> {
        fs::create_dir_all(&config.dir)?;

        let file_index = latest_index(&config.dir).map_or(0, |i| i + 1);
        let current_file = journal_path(&config.dir, file_index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current_file)?;

        Ok(Self {
            config,
            writer: BufWriter::new(file),
            current_file,
            current_file_size: 0,
            file_index,
            next_sequence,
            writes_since_fsync: 0,
        })
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn current_file_path(&self) -> &Path {
        &self.current_file
    }

    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), JournalError> {
        if entry.sequence != self.next_sequence {
            return Err(JournalError::SequenceError {
                expected: self.next_sequence,
                got: entry.sequence,
            });
        }

        if self.current_file_size >= self.config.max_file_size {
            self.rotate()?;
        }

        let bytes = entry.to_bytes();
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;

        self.current_file_size += bytes.len() as u64;
        self.next_sequence = entry.sequence + 1;
        self.writes_since_fsync += 1;

        let should_fsync = match self.config.fsync_policy {
            FsyncPolicy::EveryWrite => true,
            FsyncPolicy::EveryN(n) => self.writes_since_fsync >= n,
            FsyncPolicy::OnSync => false,
        };
        if should_fsync {
            self.writer.get_ref().sync_all()?;
            self.writes_since_fsync = 0;
        }
        Ok(())
    }

    /// Build an entry with the next sequence and append it
    pub fn write(&mut self, kind: u8, payload: Vec<u8>) -> Result<JournalEntry, JournalError> {
        let entry = JournalEntry::new(self.next_sequence, kind, payload);
        self.append(&entry)?;
        Ok(entry)
    }

    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_fsync = 0;
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), JournalError> {
        self.sync()?;

        self.file_index += 1;
        self.current_file = journal_path(&self.config.dir, self.file_index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.current_file)?;

        self.writer = BufWriter::new(file);
        self.current_file_size = 0;
        Ok(())
    }
}

pub(crate) fn journal_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{index:06}{FILE_SUFFIX}"))
}

pub(crate) fn parse_index(name: &str) -> Option<u64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

/// Journal segments in `dir`, sorted by index
pub(crate) fn segments(dir: &Path) -> io::Result<Vec<(u64, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<(u64, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let index = parse_index(&e.file_name().to_string_lossy())?;
            Some((index, e.path()))
        })
        .collect();
    files.sort_by_key(|(index, _)| *index);
    Ok(files)
}

fn latest_index(dir: &Path) -> Option<u64> {
    segments(dir).ok()?.last().map(|(index, _)| *index)
}

// ── Tests ───────────────────────────────────────────────────────────


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_decode_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = JournalEntry::from_bytes(&data);
        }

        #[test]
        fn prop_encoded_entry_decodes(
            sequence in any::<u64>(),
            kind in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..128),
        ) {
            let entry = JournalEntry::new(sequence, kind, payload);
            let (decoded, consumed) = JournalEntry::from_bytes(&entry.to_bytes()).unwrap();
            prop_assert_eq!(consumed, entry.to_bytes().len());
            prop_assert!(decoded.verify_checksum());
            prop_assert_eq!(decoded, entry);
        }
    }
}
