//! Execution records
//!
//! One `Execution` is produced per matching step. It is the in-memory form of
//! a `transaction` ledger row.

use crate::ids::{AccountId, OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use crate::records::TransactionRow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single match between a buy and a sell order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub sequence: u64, // Global monotonic sequence
    pub symbol: Symbol,

    pub buy_order: OrderId,
    pub sell_order: OrderId,
    pub buyer: AccountId,
    pub seller: AccountId,

    // Always the resting order's limit
    pub price: Price,
    pub shares: Quantity,

    pub executed_at: DateTime<Utc>,
}

impl Execution {
    /// Cash value of the execution (price × shares)
    pub fn value(&self) -> Option<Decimal> {
        self.price.notional(self.shares)
    }

    /// Check the execution did not cross an account with itself
    pub fn is_self_trade(&self) -> bool {
        self.buyer == self.seller
    }

    pub fn to_row(&self) -> TransactionRow {
        TransactionRow {
            uid: self.sequence,
            symbol: self.symbol.clone(),
            buy_order: self.buy_order,
            sell_order: self.sell_order,
            amount: self.shares.as_decimal(),
            price: self.price.as_decimal(),
            time: self.executed_at.timestamp(),
        }
    }
}
