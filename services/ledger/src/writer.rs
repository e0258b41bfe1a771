//! Ledger Writer: bounded write-behind queue
//!
//! Commands are queued in the order the cache mutated. When an enqueue makes
//! the queue reach `capacity`, the enqueuing caller drains it into the store
//! before returning. A command the store refuses is logged and counted; the
//! rest of the batch still applies.
//!
//! Lock order is always store, then queue. Holding the store lock for the
//! whole drain keeps concurrent flushes from interleaving batches.

use crate::command::LedgerCommand;
use crate::store::LedgerStore;
use crate::tables::LedgerTables;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error};
use types::records::LedgerDump;

/// Default batch capacity, matching the size of the original command buffer
pub const DEFAULT_BATCH_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub applied: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub applied: u64,
    pub failed: u64,
    pub pending: usize,
}

pub struct LedgerWriter {
    store: Mutex<Box<dyn LedgerStore>>,
    queue: Mutex<VecDeque<LedgerCommand>>,
    capacity: usize,
    applied: AtomicU64,
    failed: AtomicU64,
}

impl LedgerWriter {
    pub fn new(store: Box<dyn LedgerStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            store: Mutex::new(store),
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            applied: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue a command; flushes synchronously once the batch is full
    pub fn enqueue(&self, command: LedgerCommand) {
        let full = {
            let mut queue = self.queue.lock();
            queue.push_back(command);
            queue.len() >= self.capacity
        };
        if full {
            self.flush();
        }
    }

    /// Apply every queued command in enqueue order
    pub fn flush(&self) -> FlushReport {
        let mut store = self.store.lock();
        let batch: Vec<LedgerCommand> = self.queue.lock().drain(..).collect();
        if batch.is_empty() {
            return FlushReport::default();
        }

        let mut report = FlushReport::default();
        for command in &batch {
            match store.apply(command) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    error!(table = command.table(), command = %command, error = %e, "Ledger command failed");
                    report.failed += 1;
                }
            }
        }
        if let Err(e) = store.sync() {
            error!(error = %e, "Ledger sync failed");
        }

        self.applied.fetch_add(report.applied as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        debug!(applied = report.applied, failed = report.failed, "Ledger batch flushed");
        report
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn stats(&self) -> WriterStats {
        WriterStats {
            applied: self.applied.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }

    /// Flush, then read back the first `row_limit` rows of every table
    pub fn dump(&self, row_limit: usize) -> LedgerDump {
        self.flush();
        self.store.lock().tables().dump(row_limit)
    }

    /// Read the durable tables as of the last flush
    pub fn with_tables<R>(&self, f: impl FnOnce(&LedgerTables) -> R) -> R {
        let store = self.store.lock();
        f(store.tables())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedger;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::thread;
    use types::ids::{AccountId, OrderId, Symbol};
    use types::order::Side;
    use types::records::{AccountRow, SymbolRow};

    fn balance(id: &str, amount: i64) -> LedgerCommand {
        LedgerCommand::UpsertAccount(AccountRow {
            uid: AccountId::new(id),
            balance: Decimal::from(amount),
        })
    }

    fn writer(capacity: usize) -> LedgerWriter {
        LedgerWriter::new(Box::new(MemoryLedger::new()), capacity)
    }

    #[test]
    fn test_flushes_exactly_at_capacity() {
        let writer = writer(3);
        writer.enqueue(balance("A1", 1));
        writer.enqueue(balance("A2", 2));
        assert_eq!(writer.pending(), 2);
        writer.with_tables(|t| assert!(t.accounts.is_empty()));

        writer.enqueue(balance("A3", 3));
        assert_eq!(writer.pending(), 0);
        writer.with_tables(|t| assert_eq!(t.accounts.len(), 3));
        assert_eq!(writer.stats().applied, 3);
    }

    #[test]
    fn test_preserves_enqueue_order() {
        let writer = writer(100);
        for amount in [1000, 950, 900, 875] {
            writer.enqueue(balance("A1", amount));
        }
        writer.flush();
        writer.with_tables(|t| {
            assert_eq!(t.accounts[&AccountId::new("A1")].balance, Decimal::from(875));
        });
    }

    #[test]
    fn test_failed_command_does_not_stop_batch() {
        let writer = writer(100);
        writer.enqueue(LedgerCommand::DeleteOrder { side: Side::Buy, uid: OrderId::new(1) });
        writer.enqueue(LedgerCommand::InsertSymbol(SymbolRow { name: Symbol::new("SPY") }));
        writer.enqueue(balance("A1", 5));

        let report = writer.flush();
        assert_eq!(report, FlushReport { applied: 2, failed: 1 });
        assert_eq!(writer.stats(), WriterStats { applied: 2, failed: 1, pending: 0 });
        writer.with_tables(|t| {
            assert_eq!(t.symbols.len(), 1);
            assert_eq!(t.accounts.len(), 1);
        });
    }

    #[test]
    fn test_dump_flushes_first() {
        let writer = writer(100);
        writer.enqueue(balance("A1", 10));
        let dump = writer.dump(10);
        assert_eq!(dump.accounts.len(), 1);
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_zero_capacity_flushes_every_command() {
        let writer = writer(0);
        assert_eq!(writer.capacity(), 1);
        writer.enqueue(balance("A1", 10));
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_concurrent_enqueue_keeps_per_key_order() {
        let writer = Arc::new(writer(7));
        let mut handles = vec![];

        for t in 0..4 {
            let writer = Arc::clone(&writer);
            handles.push(thread::spawn(move || {
                let id = format!("T{t}");
                for amount in 1..=250 {
                    writer.enqueue(balance(&id, amount));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        writer.flush();

        writer.with_tables(|tables| {
            for t in 0..4 {
                let row = &tables.accounts[&AccountId::new(format!("T{t}"))];
                assert_eq!(row.balance, Decimal::from(250));
            }
        });
        assert_eq!(writer.stats().applied, 1000);
    }
}
