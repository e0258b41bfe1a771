//! In-memory rendition of the durable schema
//!
//! Tables are ordered maps so that dumps and warm-up iterate in key order.

use crate::command::LedgerCommand;
use crate::error::LedgerError;
use std::collections::BTreeMap;
use types::ids::{AccountId, OrderId, Symbol};
use types::order::Side;
use types::position::PositionKey;
use types::records::{
    AccountRow, LedgerDump, OpenOrderRow, PositionRow, SymbolRow, TransactionRow,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerTables {
    pub accounts: BTreeMap<AccountId, AccountRow>,
    pub symbols: BTreeMap<Symbol, SymbolRow>,
    pub positions: BTreeMap<PositionKey, PositionRow>,
    pub buy_orders: BTreeMap<OrderId, OpenOrderRow>,
    pub sell_orders: BTreeMap<OrderId, OpenOrderRow>,
    pub transactions: BTreeMap<u64, TransactionRow>,
    /// Highest order id ever handed out; 0 before the first order
    pub last_order_id: u64,
}

impl LedgerTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one command. Inserts reject an existing key and deletes reject a
    /// missing one; upserts always succeed.
    pub fn apply(&mut self, command: &LedgerCommand) -> Result<(), LedgerError> {
        match command {
            LedgerCommand::UpsertAccount(row) => {
                self.accounts.insert(row.uid.clone(), row.clone());
            }
            LedgerCommand::InsertSymbol(row) => {
                if self.symbols.contains_key(&row.name) {
                    return Err(LedgerError::write_failure(command, "duplicate key"));
                }
                self.symbols.insert(row.name.clone(), row.clone());
            }
            LedgerCommand::UpsertPosition(row) => {
                self.positions.insert(row.key(), row.clone());
            }
            LedgerCommand::UpsertOrder { side, row } => {
                self.orders_mut(*side).insert(row.uid, row.clone());
            }
            LedgerCommand::DeleteOrder { side, uid } => {
                if self.orders_mut(*side).remove(uid).is_none() {
                    return Err(LedgerError::write_failure(command, "no such row"));
                }
            }
            LedgerCommand::InsertTransaction(row) => {
                if self.transactions.contains_key(&row.uid) {
                    return Err(LedgerError::write_failure(command, "duplicate key"));
                }
                self.transactions.insert(row.uid, row.clone());
            }
            LedgerCommand::ReserveOrderId(uid) => {
                self.last_order_id = self.last_order_id.max(uid.value());
            }
        }
        Ok(())
    }

    pub fn orders(&self, side: Side) -> &BTreeMap<OrderId, OpenOrderRow> {
        match side {
            Side::Buy => &self.buy_orders,
            Side::Sell => &self.sell_orders,
        }
    }

    fn orders_mut(&mut self, side: Side) -> &mut BTreeMap<OrderId, OpenOrderRow> {
        match side {
            Side::Buy => &mut self.buy_orders,
            Side::Sell => &mut self.sell_orders,
        }
    }

    /// First `row_limit` rows of every table
    pub fn dump(&self, row_limit: usize) -> LedgerDump {
        LedgerDump {
            accounts: self.accounts.values().take(row_limit).cloned().collect(),
            symbols: self.symbols.values().take(row_limit).cloned().collect(),
            positions: self.positions.values().take(row_limit).cloned().collect(),
            buy_orders: self.buy_orders.values().take(row_limit).cloned().collect(),
            sell_orders: self.sell_orders.values().take(row_limit).cloned().collect(),
            transactions: self.transactions.values().take(row_limit).cloned().collect(),
        }
    }

    /// Transactions that involve `order_id` on either side, in sequence order
    pub fn transactions_for(&self, order_id: OrderId) -> impl Iterator<Item = &TransactionRow> {
        self.transactions
            .values()
            .filter(move |t| t.buy_order == order_id || t.sell_order == order_id)
    }

    pub fn row_count(&self) -> usize {
        self.accounts.len()
            + self.symbols.len()
            + self.positions.len()
            + self.buy_orders.len()
            + self.sell_orders.len()
            + self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn account(id: &str, balance: i64) -> LedgerCommand {
        LedgerCommand::UpsertAccount(AccountRow {
            uid: AccountId::new(id),
            balance: Decimal::from(balance),
        })
    }

    fn order(uid: u64, amount: i64) -> OpenOrderRow {
        OpenOrderRow {
            uid: OrderId::new(uid),
            account_id: AccountId::new("A1"),
            symbol: Symbol::new("SPY"),
            amount: Decimal::from(amount),
            price_limit: Decimal::from(5),
        }
    }

    #[test]
    fn test_upsert_replaces_row() {
        let mut tables = LedgerTables::new();
        tables.apply(&account("A1", 1000)).unwrap();
        tables.apply(&account("A1", 950)).unwrap();

        assert_eq!(tables.accounts.len(), 1);
        assert_eq!(tables.accounts[&AccountId::new("A1")].balance, Decimal::from(950));
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let mut tables = LedgerTables::new();
        let cmd = LedgerCommand::InsertSymbol(SymbolRow { name: Symbol::new("SPY") });
        tables.apply(&cmd).unwrap();

        let err = tables.apply(&cmd).unwrap_err();
        assert!(matches!(err, LedgerError::DurableWriteFailure { .. }));
        assert_eq!(tables.symbols.len(), 1);
    }

    #[test]
    fn test_order_rows_by_side() {
        let mut tables = LedgerTables::new();
        tables
            .apply(&LedgerCommand::UpsertOrder { side: Side::Sell, row: order(1, -10) })
            .unwrap();
        assert_eq!(tables.orders(Side::Sell).len(), 1);
        assert!(tables.orders(Side::Buy).is_empty());

        let wrong_side = LedgerCommand::DeleteOrder { side: Side::Buy, uid: OrderId::new(1) };
        assert!(tables.apply(&wrong_side).is_err());

        tables
            .apply(&LedgerCommand::DeleteOrder { side: Side::Sell, uid: OrderId::new(1) })
            .unwrap();
        assert!(tables.sell_orders.is_empty());
    }

    #[test]
    fn test_dump_limits_each_table() {
        let mut tables = LedgerTables::new();
        for i in 0..5 {
            tables.apply(&account(&format!("A{i}"), i)).unwrap();
        }
        tables
            .apply(&LedgerCommand::InsertSymbol(SymbolRow { name: Symbol::new("SPY") }))
            .unwrap();

        let dump = tables.dump(3);
        assert_eq!(dump.accounts.len(), 3);
        assert_eq!(dump.symbols.len(), 1);
        assert_eq!(dump.accounts[0].uid, AccountId::new("A0"));
        assert_eq!(tables.dump(0).total_rows(), 0);
    }

    #[test]
    fn test_transactions_for_order() {
        let mut tables = LedgerTables::new();
        for (uid, buy, sell) in [(1, 2, 1), (2, 3, 1), (3, 3, 4)] {
            tables
                .apply(&LedgerCommand::InsertTransaction(TransactionRow {
                    uid,
                    symbol: Symbol::new("SPY"),
                    buy_order: OrderId::new(buy),
                    sell_order: OrderId::new(sell),
                    amount: Decimal::ONE,
                    price: Decimal::from(5),
                    time: 0,
                }))
                .unwrap();
        }

        let uids: Vec<u64> = tables.transactions_for(OrderId::new(1)).map(|t| t.uid).collect();
        assert_eq!(uids, vec![1, 2]);
        assert_eq!(tables.transactions_for(OrderId::new(3)).count(), 2);
        assert_eq!(tables.row_count(), 3);
    }

    #[test]
    fn test_order_id_high_water_never_decreases() {
        let mut tables = LedgerTables::new();
        for uid in [1, 4, 2] {
            tables
                .apply(&LedgerCommand::ReserveOrderId(OrderId::new(uid)))
                .unwrap();
        }
        assert_eq!(tables.last_order_id, 4);
        assert_eq!(tables.row_count(), 0);
    }
}
