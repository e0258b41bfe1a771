//! Durable ledger commands
//!
//! Every cache mutation that must survive a restart becomes exactly one
//! command. Upserts carry the absolute post-mutation row, so replaying a
//! command twice leaves the table unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use types::ids::OrderId;
use types::order::Side;
use types::records::{AccountRow, OpenOrderRow, PositionRow, SymbolRow, TransactionRow};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerCommand {
    UpsertAccount(AccountRow),
    InsertSymbol(SymbolRow),
    UpsertPosition(PositionRow),
    /// Written to `buy_order` or `sell_order` depending on `side`
    UpsertOrder { side: Side, row: OpenOrderRow },
    DeleteOrder { side: Side, uid: OrderId },
    InsertTransaction(TransactionRow),
    /// Order id handed out, whether or not the order was accepted
    ReserveOrderId(OrderId),
}

impl LedgerCommand {
    /// Journal tag byte
    pub fn kind(&self) -> u8 {
        match self {
            LedgerCommand::UpsertAccount(_) => 1,
            LedgerCommand::InsertSymbol(_) => 2,
            LedgerCommand::UpsertPosition(_) => 3,
            LedgerCommand::UpsertOrder { .. } => 4,
            LedgerCommand::DeleteOrder { .. } => 5,
            LedgerCommand::InsertTransaction(_) => 6,
            LedgerCommand::ReserveOrderId(_) => 7,
        }
    }

    /// Table the command targets
    pub fn table(&self) -> &'static str {
        match self {
            LedgerCommand::UpsertAccount(_) => "account",
            LedgerCommand::InsertSymbol(_) => "symbol",
            LedgerCommand::UpsertPosition(_) => "position",
            LedgerCommand::UpsertOrder { side, .. } | LedgerCommand::DeleteOrder { side, .. } => {
                order_table(*side)
            }
            LedgerCommand::InsertTransaction(_) => "transaction",
            LedgerCommand::ReserveOrderId(_) => "order_sequence",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

pub(crate) fn order_table(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy_order",
        Side::Sell => "sell_order",
    }
}

impl fmt::Display for LedgerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerCommand::UpsertAccount(row) => write!(f, "upsert account {}", row.uid),
            LedgerCommand::InsertSymbol(row) => write!(f, "insert symbol {}", row.name),
            LedgerCommand::UpsertPosition(row) => {
                write!(f, "upsert position {}/{}", row.account_id, row.symbol)
            }
            LedgerCommand::UpsertOrder { side, row } => {
                write!(f, "upsert {} {}", order_table(*side), row.uid)
            }
            LedgerCommand::DeleteOrder { side, uid } => {
                write!(f, "delete {} {}", order_table(*side), uid)
            }
            LedgerCommand::InsertTransaction(row) => write!(f, "insert transaction {}", row.uid),
            LedgerCommand::ReserveOrderId(uid) => write!(f, "reserve order id {}", uid),
        }
    }
}
