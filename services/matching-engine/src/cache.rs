//! Fast cache
//!
//! Live state of the exchange: accounts, positions, symbols, orders, the
//! per-symbol books behind the match lock, and the id counters. Every
//! mutation that must survive a restart enqueues one ledger command while
//! the mutated key is still guarded, so per-key enqueue order is mutation
//! order.
//!
//! DashMap guards are never nested. Callers that need two entries (a fill
//! touching buyer and seller) take them one at a time.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ledger::{LedgerCommand, LedgerTables, LedgerWriter};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use types::account::Account;
use types::errors::{AccountError, OrderError};
use types::ids::{AccountId, OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Fill, Order, Side};
use types::position::{Position, PositionKey};
use types::records::{AccountRow, OpenOrderRow, PositionRow, SymbolRow, TransactionRow};
use types::trade::Execution;

use crate::book::OrderBook;

/// Books of every symbol; holding this guard is holding the match lock
pub type Books = HashMap<Symbol, OrderBook>;

pub struct FastCache {
    accounts: DashMap<AccountId, Account>,
    positions: DashMap<PositionKey, Position>,
    symbols: DashMap<Symbol, SymbolRow>,
    orders: DashMap<OrderId, Order>,
    books: Mutex<Books>,
    next_order_id: AtomicU64,
    next_execution: AtomicU64,
    writer: Arc<LedgerWriter>,
}

/// What a warm-up restored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupReport {
    pub accounts: usize,
    pub symbols: usize,
    pub positions: usize,
    pub open_orders: usize,
}

impl FastCache {
    pub fn new(writer: Arc<LedgerWriter>) -> Self {
        Self {
            accounts: DashMap::new(),
            positions: DashMap::new(),
            symbols: DashMap::new(),
            orders: DashMap::new(),
            books: Mutex::new(HashMap::new()),
            next_order_id: AtomicU64::new(1),
            next_execution: AtomicU64::new(1),
            writer,
        }
    }

    pub fn writer(&self) -> &Arc<LedgerWriter> {
        &self.writer
    }

    // ---- accounts ----

    /// Create an account; an id already in the cache or the store is a duplicate
    pub fn create_account(&self, id: AccountId, balance: Decimal) -> Result<(), AccountError> {
        let account = Account::open(id.clone(), balance)?;
        if self.persisted_account(&id).is_some() {
            return Err(AccountError::Duplicate { account_id: id });
        }
        match self.accounts.entry(id) {
            Entry::Occupied(entry) => Err(AccountError::Duplicate {
                account_id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                let account = entry.insert(account);
                self.writer
                    .enqueue(LedgerCommand::UpsertAccount(AccountRow::from(&*account)));
                Ok(())
            }
        }
    }

    /// Make sure the account is cached, reading it from the store on a miss
    pub fn hydrate_account(&self, id: &AccountId) -> bool {
        if self.accounts.contains_key(id) {
            return true;
        }
        match self.persisted_account(id) {
            Some(row) => {
                debug!(account_id = %id, "Account loaded from ledger");
                self.accounts.entry(id.clone()).or_insert(Account {
                    id: row.uid,
                    balance: row.balance,
                });
                true
            }
            None => false,
        }
    }

    pub fn balance(&self, id: &AccountId) -> Option<Decimal> {
        if !self.hydrate_account(id) {
            return None;
        }
        self.accounts.get(id).map(|account| account.balance)
    }

    /// Check `required` against the balance
    pub fn ensure_funds(&self, id: &AccountId, required: Decimal) -> Result<(), AccountError> {
        if !self.hydrate_account(id) {
            return Err(AccountError::NotFound { account_id: id.clone() });
        }
        match self.accounts.get(id) {
            Some(account) => account.ensure_funds(required),
            None => Err(AccountError::NotFound { account_id: id.clone() }),
        }
    }

    /// Add `delta` (negative to debit); returns the new balance
    pub fn adjust_balance(&self, id: &AccountId, delta: Decimal) -> Result<Decimal, AccountError> {
        if !self.hydrate_account(id) {
            return Err(AccountError::NotFound { account_id: id.clone() });
        }
        let mut account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| AccountError::NotFound { account_id: id.clone() })?;
        account.credit(delta)?;
        self.writer
            .enqueue(LedgerCommand::UpsertAccount(AccountRow::from(&*account)));
        Ok(account.balance)
    }

    /// Fails if crediting `delta` would leave the balance unrepresentable
    pub fn check_credit(&self, id: &AccountId, delta: Decimal) -> Result<(), AccountError> {
        if !self.hydrate_account(id) {
            return Err(AccountError::NotFound { account_id: id.clone() });
        }
        match self.accounts.get(id) {
            Some(account) => account.balance_after(delta).map(|_| ()),
            None => Err(AccountError::NotFound { account_id: id.clone() }),
        }
    }

    fn persisted_account(&self, id: &AccountId) -> Option<AccountRow> {
        self.writer.with_tables(|tables| tables.accounts.get(id).cloned())
    }

    // ---- positions ----

    /// Shares held; an absent position is zero
    pub fn position_amount(&self, key: &PositionKey) -> Decimal {
        if let Some(position) = self.positions.get(key) {
            return position.amount;
        }
        self.persisted_position(key)
            .map(|row| row.amount)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn ensure_shares(&self, key: &PositionKey, required: Quantity) -> Result<(), AccountError> {
        let mut position = Position::empty(key);
        position.amount = self.position_amount(key);
        position.ensure_shares(required)
    }

    /// Fails if adding `delta` shares would leave the holding unrepresentable
    pub fn check_position_credit(&self, key: &PositionKey, delta: Decimal) -> Result<(), AccountError> {
        let mut position = Position::empty(key);
        position.amount = self.position_amount(key);
        position.amount_after(delta).map(|_| ())
    }

    /// Add `delta` shares, creating the position on first credit
    pub fn adjust_position(&self, key: &PositionKey, delta: Decimal) -> Result<Decimal, AccountError> {
        let persisted = if self.positions.contains_key(key) {
            None
        } else {
            self.persisted_position(key)
        };
        let mut position = self.positions.entry(key.clone()).or_insert_with(|| {
            let mut position = Position::empty(key);
            if let Some(row) = persisted {
                position.amount = row.amount;
            }
            position
        });
        position.increment(delta)?;
        self.writer
            .enqueue(LedgerCommand::UpsertPosition(PositionRow::from(&*position)));
        Ok(position.amount)
    }

    /// Every cached position of one account
    pub fn positions_of(&self, id: &AccountId) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .filter(|entry| &entry.key().account_id == id)
            .map(|entry| entry.value().clone())
            .collect();
        let persisted: Vec<PositionRow> = self.writer.with_tables(|tables| {
            tables
                .positions
                .values()
                .filter(|row| &row.account_id == id)
                .cloned()
                .collect()
        });
        for row in persisted {
            if !positions.iter().any(|p| p.symbol == row.symbol) {
                positions.push(Position {
                    account_id: row.account_id,
                    symbol: row.symbol,
                    amount: row.amount,
                });
            }
        }
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }

    fn persisted_position(&self, key: &PositionKey) -> Option<PositionRow> {
        self.writer.with_tables(|tables| tables.positions.get(key).cloned())
    }

    // ---- symbols ----

    /// Create the symbol on first reference; returns true if it was new
    pub fn ensure_symbol(&self, symbol: &Symbol) -> bool {
        if self.symbols.contains_key(symbol) {
            return false;
        }
        let persisted = self
            .writer
            .with_tables(|tables| tables.symbols.get(symbol).cloned());
        match self.symbols.entry(symbol.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => match persisted {
                Some(row) => {
                    entry.insert(row);
                    false
                }
                None => {
                    let row = entry.insert(SymbolRow { name: symbol.clone() });
                    self.writer.enqueue(LedgerCommand::InsertSymbol(row.clone()));
                    info!(symbol = %symbol, "Symbol created");
                    true
                }
            },
        }
    }

    pub fn has_symbol(&self, symbol: &Symbol) -> bool {
        self.symbols.contains_key(symbol)
    }

    // ---- orders ----

    /// Allocate an order id and journal it, so a restart never hands it out again
    pub fn next_order_id(&self) -> OrderId {
        let id = OrderId::new(self.next_order_id.fetch_add(1, Ordering::SeqCst));
        self.writer.enqueue(LedgerCommand::ReserveOrderId(id));
        id
    }

    pub fn next_execution_sequence(&self) -> u64 {
        self.next_execution.fetch_add(1, Ordering::SeqCst)
    }

    pub fn insert_order(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    /// Copy of an order
    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.orders.get(&id).map(|order| order.clone())
    }

    /// Mutate an order in place; `None` if it is unknown
    pub fn with_order_mut<R>(&self, id: OrderId, f: impl FnOnce(&mut Order) -> R) -> Option<R> {
        self.orders.get_mut(&id).map(|mut order| f(&mut order))
    }

    /// Write the open-order row of a live order
    pub fn write_open_order(&self, order: &Order) {
        self.writer.enqueue(LedgerCommand::UpsertOrder {
            side: order.side(),
            row: OpenOrderRow::from(order),
        });
    }

    pub fn delete_open_order(&self, side: Side, id: OrderId) {
        self.writer.enqueue(LedgerCommand::DeleteOrder { side, uid: id });
    }

    pub fn record_execution(&self, execution: &Execution) {
        self.writer
            .enqueue(LedgerCommand::InsertTransaction(execution.to_row()));
    }

    /// Take the match lock
    pub fn lock_books(&self) -> MutexGuard<'_, Books> {
        self.books.lock()
    }

    // ---- warm-up ----

    /// Rebuild the cache from durable tables.
    ///
    /// Open orders get their fills back from the transaction rows and are
    /// re-parked in id order. Counters move past every persisted id.
    pub fn warm_from(&self, tables: &LedgerTables) -> Result<WarmupReport, OrderError> {
        let mut report = WarmupReport::default();

        for row in tables.accounts.values() {
            self.accounts.insert(
                row.uid.clone(),
                Account {
                    id: row.uid.clone(),
                    balance: row.balance,
                },
            );
            report.accounts += 1;
        }
        for row in tables.symbols.values() {
            self.symbols.insert(row.name.clone(), row.clone());
            report.symbols += 1;
        }
        for row in tables.positions.values() {
            self.positions.insert(
                row.key(),
                Position {
                    account_id: row.account_id.clone(),
                    symbol: row.symbol.clone(),
                    amount: row.amount,
                },
            );
            report.positions += 1;
        }

        let mut restored = Vec::new();
        for side in [Side::Buy, Side::Sell] {
            for row in tables.orders(side).values() {
                restored.push(restore_order(tables, side, row)?);
            }
        }
        restored.sort_by_key(|order| order.id);

        {
            let mut books = self.books.lock();
            for order in restored {
                books
                    .entry(order.symbol.clone())
                    .or_insert_with(|| OrderBook::new(order.symbol.clone()))
                    .park(order.side(), order.id, order.limit, order.remaining());
                self.orders.insert(order.id, order);
                report.open_orders += 1;
            }
        }

        let max_order = tables
            .buy_orders
            .keys()
            .chain(tables.sell_orders.keys())
            .map(OrderId::value)
            .chain(
                tables
                    .transactions
                    .values()
                    .flat_map(|tx| [tx.buy_order.value(), tx.sell_order.value()]),
            )
            .chain([tables.last_order_id])
            .max()
            .unwrap_or(0);
        let max_sequence = tables.transactions.keys().copied().max().unwrap_or(0);
        self.next_order_id.fetch_max(max_order + 1, Ordering::SeqCst);
        self.next_execution.fetch_max(max_sequence + 1, Ordering::SeqCst);

        info!(
            accounts = report.accounts,
            symbols = report.symbols,
            positions = report.positions,
            open_orders = report.open_orders,
            next_order_id = max_order + 1,
            "Cache warmed from ledger"
        );
        Ok(report)
    }
}

fn restore_order(tables: &LedgerTables, side: Side, row: &OpenOrderRow) -> Result<Order, OrderError> {
    let malformed = |detail: String| OrderError::MalformedData {
        order_id: row.uid,
        detail,
    };

    if Side::from_amount(row.amount) != Some(side) {
        return Err(malformed(format!(
            "remainder {} stored as a {:?} order",
            row.amount, side
        )));
    }
    let limit = Price::try_new(row.price_limit).map_err(|e| malformed(e.to_string()))?;

    let mut fills = Vec::new();
    for tx in tables.transactions_for(row.uid) {
        let shares = Quantity::try_new(tx.amount).map_err(|e| malformed(e.to_string()))?;
        fills.push(Fill {
            shares: fill_sign(side, row.uid, tx).signed(shares),
            price: Price::try_new(tx.price).map_err(|e| malformed(e.to_string()))?,
            time: unix_time(tx.time),
        });
    }

    Order::restore(
        row.uid,
        row.account_id.clone(),
        row.symbol.clone(),
        row.amount,
        limit,
        fills,
        Utc::now(),
    )
}

/// Side the transaction row assigns to `order_id`; a mismatch with the
/// order's own side surfaces as a sign error in `Order::restore`
fn fill_sign(side: Side, order_id: OrderId, tx: &TransactionRow) -> Side {
    if tx.buy_order == order_id && tx.sell_order == order_id {
        side
    } else if tx.buy_order == order_id {
        Side::Buy
    } else {
        Side::Sell
    }
}

fn unix_time(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::MemoryLedger;

    fn cache() -> FastCache {
        let writer = Arc::new(LedgerWriter::new(Box::new(MemoryLedger::new()), 100));
        FastCache::new(writer)
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let cache = cache();
        cache.create_account(AccountId::new("A1"), dec("100")).unwrap();
        let err = cache.create_account(AccountId::new("A1"), dec("5")).unwrap_err();
        assert!(matches!(err, AccountError::Duplicate { .. }));
        assert_eq!(cache.balance(&AccountId::new("A1")), Some(dec("100")));
    }

    #[test]
    fn test_duplicate_detected_after_flush_from_store() {
        let cache = cache();
        cache.create_account(AccountId::new("A1"), dec("100")).unwrap();
        cache.writer().flush();

        let fresh = FastCache::new(cache.writer().clone());
        let err = fresh.create_account(AccountId::new("A1"), dec("1")).unwrap_err();
        assert!(matches!(err, AccountError::Duplicate { .. }));
        // Balance lookups fall back to the store
        assert_eq!(fresh.balance(&AccountId::new("A1")), Some(dec("100")));
    }

    #[test]
    fn test_adjust_balance_enqueues_absolute_value() {
        let cache = cache();
        let id = AccountId::new("A1");
        cache.create_account(id.clone(), dec("100")).unwrap();
        assert_eq!(cache.adjust_balance(&id, dec("-30")).unwrap(), dec("70"));

        let dump = cache.writer().dump(10);
        assert_eq!(dump.accounts[0].balance, dec("70"));
        assert!(cache.adjust_balance(&AccountId::new("nobody"), dec("1")).is_err());
    }

    #[test]
    fn test_position_absent_is_zero() {
        let cache = cache();
        let key = PositionKey::new(AccountId::new("A1"), Symbol::new("SPY"));
        assert_eq!(cache.position_amount(&key), Decimal::ZERO);
        assert!(cache.ensure_shares(&key, Quantity::from_u64(1)).is_err());

        assert_eq!(cache.adjust_position(&key, dec("2.5")).unwrap(), dec("2.5"));
        assert!(cache.ensure_shares(&key, Quantity::from_u64(2)).is_ok());
        assert_eq!(cache.positions_of(&AccountId::new("A1")).len(), 1);
    }

    #[test]
    fn test_symbol_created_once() {
        let cache = cache();
        let spy = Symbol::new("SPY");
        assert!(cache.ensure_symbol(&spy));
        assert!(!cache.ensure_symbol(&spy));

        let dump = cache.writer().dump(10);
        assert_eq!(dump.symbols.len(), 1);
        assert_eq!(cache.writer().stats().failed, 0);
    }

    #[test]
    fn test_order_ids_are_monotonic() {
        let cache = cache();
        let a = cache.next_order_id();
        let b = cache.next_order_id();
        assert_eq!(a, OrderId::new(1));
        assert!(b > a);
    }

    #[test]
    fn test_warm_up_rejects_wrong_side_row() {
        let mut tables = LedgerTables::new();
        tables.apply(&LedgerCommand::UpsertOrder {
            side: Side::Buy,
            row: OpenOrderRow {
                uid: OrderId::new(5),
                account_id: AccountId::new("A1"),
                symbol: Symbol::new("SPY"),
                amount: dec("-3"),
                price_limit: dec("5"),
            },
        })
        .unwrap();

        let err = cache().warm_from(&tables).unwrap_err();
        assert!(matches!(err, OrderError::MalformedData { .. }));
    }

    #[test]
    fn test_warm_up_rebuilds_fills_and_counters() {
        let mut tables = LedgerTables::new();
        let commands = [
            LedgerCommand::UpsertOrder {
                side: Side::Sell,
                row: OpenOrderRow {
                    uid: OrderId::new(1),
                    account_id: AccountId::new("A2"),
                    symbol: Symbol::new("SPY"),
                    amount: dec("-6"),
                    price_limit: dec("5"),
                },
            },
            LedgerCommand::InsertTransaction(TransactionRow {
                uid: 4,
                symbol: Symbol::new("SPY"),
                buy_order: OrderId::new(2),
                sell_order: OrderId::new(1),
                amount: dec("4"),
                price: dec("5"),
                time: 1_700_000_000,
            }),
        ];
        for command in &commands {
            tables.apply(command).unwrap();
        }

        let cache = cache();
        let report = cache.warm_from(&tables).unwrap();
        assert_eq!(report.open_orders, 1);

        let order = cache.order(OrderId::new(1)).unwrap();
        assert_eq!(order.original_amount, dec("-10"));
        assert_eq!(order.fills[0].shares, dec("-4"));
        assert!(order.check_invariant());

        assert_eq!(cache.next_order_id(), OrderId::new(3));
        assert_eq!(cache.next_execution_sequence(), 5);
        let books = cache.lock_books();
        assert!(books[&Symbol::new("SPY")].contains(OrderId::new(1)));
    }

    #[test]
    fn test_warm_up_skips_ids_without_rows() {
        let mut tables = LedgerTables::new();
        tables
            .apply(&LedgerCommand::ReserveOrderId(OrderId::new(7)))
            .unwrap();

        let cache = cache();
        cache.warm_from(&tables).unwrap();
        assert_eq!(cache.next_order_id(), OrderId::new(8));

        cache.writer().flush();
        assert_eq!(cache.writer().with_tables(|t| t.last_order_id), 8);
    }
}
