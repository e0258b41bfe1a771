//! Ledger stores
//!
//! A store owns the durable tables. `MemoryLedger` keeps them only in memory;
//! `JournalLedger` also appends every applied command to the journal and
//! rebuilds its tables from it on open.

use crate::command::LedgerCommand;
use crate::error::LedgerError;
use crate::journal::{JournalConfig, JournalWriter};
use crate::reader::{CorruptionRecord, JournalReader};
use crate::tables::LedgerTables;
use tracing::{info, warn};

pub trait LedgerStore: Send {
    /// Apply one command. A failure leaves the tables as they were.
    fn apply(&mut self, command: &LedgerCommand) -> Result<(), LedgerError>;

    /// Make everything applied so far durable
    fn sync(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }

    fn tables(&self) -> &LedgerTables;
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    tables: LedgerTables,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing tables (e.g. a copy of another store)
    pub fn with_tables(tables: LedgerTables) -> Self {
        Self { tables }
    }
}

impl LedgerStore for MemoryLedger {
    fn apply(&mut self, command: &LedgerCommand) -> Result<(), LedgerError> {
        self.tables.apply(command)
    }

    fn tables(&self) -> &LedgerTables {
        &self.tables
    }
}

/// Journal-backed store
pub struct JournalLedger {
    tables: LedgerTables,
    journal: JournalWriter,
    replayed: usize,
    corruption: Vec<CorruptionRecord>,
}

impl JournalLedger {
    /// Replay every readable entry under `config.dir`, then open a new
    /// segment for subsequent writes.
    pub fn open(config: JournalConfig) -> Result<Self, LedgerError> {
        let mut reader = JournalReader::open(&config.dir)?;
        let mut tables = LedgerTables::new();
        let mut replayed = 0usize;

        while let Some(entry) = reader.next_entry()? {
            let command = match LedgerCommand::decode(&entry.payload) {
                Ok(command) => command,
                Err(e) => {
                    warn!(sequence = entry.sequence, error = %e, "Undecodable journal entry skipped");
                    continue;
                }
            };
            if let Err(e) = tables.apply(&command) {
                warn!(sequence = entry.sequence, error = %e, "Journal entry did not apply on replay");
                continue;
            }
            replayed += 1;
        }

        let corruption = reader.corruption_log().to_vec();
        for record in &corruption {
            warn!(
                file = %record.file.display(),
                offset = record.byte_offset,
                skipped = record.skipped_bytes,
                kind = ?record.kind,
                detail = %record.detail,
                "Skipped corrupted journal region"
            );
        }

        let next_sequence = reader.last_sequence().map_or(1, |s| s + 1);
        let journal = JournalWriter::open(config, next_sequence)?;

        info!(
            replayed,
            rows = tables.row_count(),
            next_sequence,
            "Journal ledger opened"
        );

        Ok(Self {
            tables,
            journal,
            replayed,
            corruption,
        })
    }

    /// Number of commands rebuilt from disk on open
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    pub fn corruption(&self) -> &[CorruptionRecord] {
        &self.corruption
    }
}

impl LedgerStore for JournalLedger {
    fn apply(&mut self, command: &LedgerCommand) -> Result<(), LedgerError> {
        // Tables reject first, so a refused command never reaches disk.
        self.tables.apply(command)?;
        let payload = command.encode()?;
        self.journal.write(command.kind(), payload)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), LedgerError> {
        self.journal.sync()?;
        Ok(())
    }

    fn tables(&self) -> &LedgerTables {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tempfile::TempDir;
    use types::ids::{AccountId, OrderId, Symbol};
    use types::order::Side;
    use types::records::{AccountRow, OpenOrderRow, SymbolRow};

    fn commands() -> Vec<LedgerCommand> {
        vec![
            LedgerCommand::UpsertAccount(AccountRow {
                uid: AccountId::new("A1"),
                balance: Decimal::from(1000),
            }),
            LedgerCommand::InsertSymbol(SymbolRow { name: Symbol::new("SPY") }),
            LedgerCommand::UpsertOrder {
                side: Side::Buy,
                row: OpenOrderRow {
                    uid: OrderId::new(1),
                    account_id: AccountId::new("A1"),
                    symbol: Symbol::new("SPY"),
                    amount: Decimal::from(10),
                    price_limit: "4.5".parse().unwrap(),
                },
            },
            LedgerCommand::UpsertAccount(AccountRow {
                uid: AccountId::new("A1"),
                balance: Decimal::from(955),
            }),
        ]
    }

    #[test]
    fn test_memory_ledger_applies() {
        let mut store = MemoryLedger::new();
        for cmd in commands() {
            store.apply(&cmd).unwrap();
        }
        assert_eq!(store.tables().accounts[&AccountId::new("A1")].balance, Decimal::from(955));
        assert_eq!(store.tables().buy_orders.len(), 1);
    }

    #[test]
    fn test_journal_ledger_replays_to_identical_tables() {
        let tmp = TempDir::new().unwrap();
        let expected = {
            let mut store = JournalLedger::open(JournalConfig::new(tmp.path())).unwrap();
            for cmd in commands() {
                store.apply(&cmd).unwrap();
            }
            store.sync().unwrap();
            store.tables().clone()
        };

        let reopened = JournalLedger::open(JournalConfig::new(tmp.path())).unwrap();
        assert_eq!(reopened.replayed(), 4);
        assert_eq!(reopened.tables(), &expected);
        assert!(reopened.corruption().is_empty());
    }

    #[test]
    fn test_rejected_command_not_journaled() {
        let tmp = TempDir::new().unwrap();
        {
            let mut store = JournalLedger::open(JournalConfig::new(tmp.path())).unwrap();
            let symbol = LedgerCommand::InsertSymbol(SymbolRow { name: Symbol::new("SPY") });
            store.apply(&symbol).unwrap();
            assert!(store.apply(&symbol).is_err());
            assert!(store
                .apply(&LedgerCommand::DeleteOrder { side: Side::Sell, uid: OrderId::new(9) })
                .is_err());
            store.sync().unwrap();
        }

        let reopened = JournalLedger::open(JournalConfig::new(tmp.path())).unwrap();
        assert_eq!(reopened.replayed(), 1);
        assert_eq!(reopened.tables().symbols.len(), 1);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let tmp = TempDir::new().unwrap();
        for round in 0..3 {
            let mut store = JournalLedger::open(JournalConfig::new(tmp.path())).unwrap();
            assert_eq!(store.replayed(), round);
            store
                .apply(&LedgerCommand::UpsertAccount(AccountRow {
                    uid: AccountId::new(format!("A{round}")),
                    balance: Decimal::ZERO,
                }))
                .unwrap();
            store.sync().unwrap();
        }
    }
}
