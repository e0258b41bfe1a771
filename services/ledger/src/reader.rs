//! Journal Reader: sequential replay with corruption detection
//!
//! Reads segments in index order. The first undecodable, checksum-failing
//! or out-of-sequence entry in a segment ends that segment: the valid
//! prefix is kept, the rest is recorded in the corruption log and skipped.

use crate::journal::{segments, JournalEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorruptionKind {
    ChecksumMismatch,
    TruncatedEntry,
    SequenceRegression,
}

#[derive(Debug, Clone)]
pub struct CorruptionRecord {
    pub file: PathBuf,
    /// Offset within `file` where the skipped region starts
    pub byte_offset: u64,
    pub kind: CorruptionKind,
    pub skipped_bytes: u64,
    pub detail: String,
}

pub struct JournalReader {
    files: Vec<PathBuf>,
    current_file_idx: usize,
    data: Vec<u8>,
    pos: usize,
    last_sequence: Option<u64>,
    corruption_log: Vec<CorruptionRecord>,
}

impl JournalReader {
    pub fn open(dir: &Path) -> Result<Self, ReaderError> {
        let files: Vec<PathBuf> = segments(dir)?.into_iter().map(|(_, p)| p).collect();
        let data = match files.first() {
            Some(path) => fs::read(path)?,
            None => Vec::new(),
        };
        Ok(Self {
            files,
            current_file_idx: 0,
            data,
            pos: 0,
            last_sequence: None,
            corruption_log: Vec::new(),
        })
    }

    /// Next valid entry, or `None` once every segment is exhausted
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>, ReaderError> {
        loop {
            if self.pos >= self.data.len() {
                if !self.advance_file()? {
                    return Ok(None);
                }
                continue;
            }

            let (entry, consumed) = match JournalEntry::from_bytes(&self.data[self.pos..]) {
                Ok(decoded) => decoded,
                Err(e) => {
                    self.skip_rest(CorruptionKind::TruncatedEntry, e.to_string());
                    continue;
                }
            };

            if !entry.verify_checksum() {
                self.skip_rest(
                    CorruptionKind::ChecksumMismatch,
                    format!(
                        "CRC32C mismatch for seq={}, stored={:#010x}",
                        entry.sequence, entry.checksum
                    ),
                );
                continue;
            }

            if let Some(last) = self.last_sequence {
                if entry.sequence <= last {
                    self.skip_rest(
                        CorruptionKind::SequenceRegression,
                        format!("seq={} after seq={}", entry.sequence, last),
                    );
                    continue;
                }
            }

            self.pos += consumed;
            self.last_sequence = Some(entry.sequence);
            return Ok(Some(entry));
        }
    }

    pub fn read_all(&mut self) -> Result<Vec<JournalEntry>, ReaderError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn corruption_log(&self) -> &[CorruptionRecord] {
        &self.corruption_log
    }

    fn skip_rest(&mut self, kind: CorruptionKind, detail: String) {
        let file = self
            .files
            .get(self.current_file_idx)
            .cloned()
            .unwrap_or_default();
        self.corruption_log.push(CorruptionRecord {
            file,
            byte_offset: self.pos as u64,
            kind,
            skipped_bytes: (self.data.len() - self.pos) as u64,
            detail,
        });
        self.pos = self.data.len();
    }

    fn advance_file(&mut self) -> Result<bool, ReaderError> {
        self.current_file_idx += 1;
        self.pos = 0;
        match self.files.get(self.current_file_idx) {
            Some(path) => {
                self.data = fs::read(path)?;
                Ok(true)
            }
            None => {
                self.data.clear();
                Ok(false)
            }
        }
    }
}
