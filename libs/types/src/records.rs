//! Durable ledger rows
//!
//! One struct per table of the durable schema. Rows carry raw decimals and
//! Unix-second times; they are validated when loaded back into live types.

use crate::account::Account;
use crate::ids::{AccountId, OrderId, Symbol};
use crate::order::Order;
use crate::position::{Position, PositionKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `account(uid, balance)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRow {
    pub uid: AccountId,
    pub balance: Decimal,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        Self {
            uid: account.id.clone(),
            balance: account.balance,
        }
    }
}

/// `symbol(name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRow {
    pub name: Symbol,
}

/// `position(account_id, symbol, amount)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRow {
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub amount: Decimal,
}

impl PositionRow {
    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.account_id.clone(), self.symbol.clone())
    }
}

impl From<&Position> for PositionRow {
    fn from(position: &Position) -> Self {
        Self {
            account_id: position.account_id.clone(),
            symbol: position.symbol.clone(),
            amount: position.amount,
        }
    }
}

/// `buy_order` / `sell_order(uid, account_id, symbol, amount, price_limit)`
///
/// `amount` is the signed open remainder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrderRow {
    pub uid: OrderId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub amount: Decimal,
    pub price_limit: Decimal,
}

impl From<&Order> for OpenOrderRow {
    fn from(order: &Order) -> Self {
        Self {
            uid: order.id,
            account_id: order.account_id.clone(),
            symbol: order.symbol.clone(),
            amount: order.remaining_amount,
            price_limit: order.limit.as_decimal(),
        }
    }
}

/// `transaction(uid, symbol, buy_order, sell_order, amount, price, time)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub uid: u64,
    pub symbol: Symbol,
    pub buy_order: OrderId,
    pub sell_order: OrderId,
    pub amount: Decimal,
    pub price: Decimal,
    pub time: i64,
}

/// Bounded read-back of every table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDump {
    pub accounts: Vec<AccountRow>,
    pub symbols: Vec<SymbolRow>,
    pub positions: Vec<PositionRow>,
    pub buy_orders: Vec<OpenOrderRow>,
    pub sell_orders: Vec<OpenOrderRow>,
    pub transactions: Vec<TransactionRow>,
}

impl LedgerDump {
    pub fn total_rows(&self) -> usize {
        self.accounts.len()
            + self.symbols.len()
            + self.positions.len()
            + self.buy_orders.len()
            + self.sell_orders.len()
            + self.transactions.len()
    }
}
