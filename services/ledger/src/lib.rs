//! Durable ledger for the exchange
//!
//! Holds the secondary system of record: account, symbol, position,
//! open-order and transaction tables. Writes arrive as typed commands through
//! a bounded write-behind queue and land in either an in-memory store or a
//! checksummed append-only journal that is replayed on startup.

pub mod command;
pub mod error;
pub mod journal;
pub mod reader;
pub mod store;
pub mod tables;
pub mod writer;

pub use command::LedgerCommand;
pub use error::LedgerError;
pub use journal::{FsyncPolicy, JournalConfig};
pub use store::{JournalLedger, LedgerStore, MemoryLedger};
pub use tables::LedgerTables;
pub use writer::{FlushReport, LedgerWriter, WriterStats, DEFAULT_BATCH_CAPACITY};
