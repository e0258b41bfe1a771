//! Ledger error types

use crate::journal::JournalError;
use crate::reader::ReaderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// A single command could not be applied; the writer logs it and moves on
    #[error("Durable write failed for {command}: {reason}")]
    DurableWriteFailure { command: String, reason: String },

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Journal read error: {0}")]
    Reader(#[from] ReaderError),

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl LedgerError {
    pub(crate) fn write_failure(command: impl ToString, reason: impl Into<String>) -> Self {
        LedgerError::DurableWriteFailure {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}
