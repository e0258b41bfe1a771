//! Command dispatcher
//!
//! Turns one inbound `Command` into exactly one `CommandResult`. Failures
//! become results carrying the error's display text; nothing here panics on
//! bad input.

use tracing::warn;
use types::command::{Command, CommandResult};

use crate::exchange::Exchange;

impl Exchange {
    pub fn dispatch(&self, command: Command) -> CommandResult {
        match command {
            Command::CreateAccount { id, balance } => match self.create_account(&id, balance) {
                Ok(id) => CommandResult::AccountCreated { id: id.to_string() },
                Err(e) => {
                    warn!(account_id = %id, error = %e, "Account creation rejected");
                    CommandResult::CreateFailed {
                        target: id,
                        reason: e.to_string(),
                    }
                }
            },
            Command::CreateSymbol { name, credits } => match self.create_symbol(&name, &credits) {
                Ok(symbol) => CommandResult::SymbolCreated {
                    name: symbol.to_string(),
                },
                Err(e) => {
                    warn!(symbol = %name, error = %e, "Symbol creation rejected");
                    CommandResult::CreateFailed {
                        target: name,
                        reason: e.to_string(),
                    }
                }
            },
            Command::OpenOrder {
                account_id,
                symbol,
                amount,
                limit,
            } => match self.open_order(&account_id, &symbol, amount, limit) {
                Ok(result) => CommandResult::Opened {
                    order_id: result.order_id,
                    symbol: result.symbol.to_string(),
                    amount,
                    limit,
                },
                Err(e) => {
                    warn!(account_id = %account_id, symbol = %symbol, error = %e, "Order rejected");
                    CommandResult::OpenFailed {
                        symbol,
                        amount,
                        limit,
                        reason: e.to_string(),
                    }
                }
            },
            Command::CancelOrder { order_id } => match self.cancel_order(order_id) {
                Ok(report) => CommandResult::Cancelled { order_id, report },
                Err(e) => CommandResult::OrderFailed {
                    order_id,
                    reason: e.to_string(),
                },
            },
            Command::QueryOrder { order_id } => match self.query_order(order_id) {
                Ok(report) => CommandResult::Status { order_id, report },
                Err(e) => CommandResult::OrderFailed {
                    order_id,
                    reason: e.to_string(),
                },
            },
            Command::DumpState { row_limit } => CommandResult::Dump(self.dump(row_limit)),
        }
    }
}
