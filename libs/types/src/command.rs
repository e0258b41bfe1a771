//! Commands accepted by the dispatcher and the results it returns
//!
//! Amounts arrive as raw decimals; validation into `Price`/`Quantity` and the
//! typed ids happens in the dispatcher so every rejection becomes a result
//! rather than a decode failure.

use crate::ids::OrderId;
use crate::order::OrderStatusReport;
use crate::records::LedgerDump;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Initial holding granted when a symbol is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolCredit {
    pub account_id: String,
    pub shares: Decimal,
}

/// Inbound command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CreateAccount {
        id: String,
        balance: Decimal,
    },
    CreateSymbol {
        name: String,
        credits: Vec<SymbolCredit>,
    },
    /// Positive amount buys, negative sells
    OpenOrder {
        account_id: String,
        symbol: String,
        amount: Decimal,
        limit: Decimal,
    },
    CancelOrder {
        order_id: OrderId,
    },
    QueryOrder {
        order_id: OrderId,
    },
    DumpState {
        row_limit: usize,
    },
}

/// Outcome of one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResult {
    AccountCreated {
        id: String,
    },
    SymbolCreated {
        name: String,
    },
    /// `target` is the account id or symbol name the create referred to
    CreateFailed {
        target: String,
        reason: String,
    },
    Opened {
        order_id: OrderId,
        symbol: String,
        amount: Decimal,
        limit: Decimal,
    },
    OpenFailed {
        symbol: String,
        amount: Decimal,
        limit: Decimal,
        reason: String,
    },
    Cancelled {
        order_id: OrderId,
        report: OrderStatusReport,
    },
    Status {
        order_id: OrderId,
        report: OrderStatusReport,
    },
    /// Cancel or query that could not be answered
    OrderFailed {
        order_id: OrderId,
        reason: String,
    },
    Dump(LedgerDump),
}

impl CommandResult {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            CommandResult::CreateFailed { .. }
                | CommandResult::OpenFailed { .. }
                | CommandResult::OrderFailed { .. }
        )
    }

    /// Reason text of a failed command
    pub fn reason(&self) -> Option<&str> {
        match self {
            CommandResult::CreateFailed { reason, .. }
            | CommandResult::OpenFailed { reason, .. }
            | CommandResult::OrderFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
