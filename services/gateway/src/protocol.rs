//! Request and response documents of the order protocol
//!
//! A request is one of `create`, `transactions` or `dump`; the response holds
//! one result per item in request order. Decimal amounts travel as strings.

use matching_engine::Exchange;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::command::{Command, CommandResult, SymbolCredit};
use types::ids::{AccountId, OrderId};
use types::order::{Fill, OrderStatusReport, ReportState};
use types::records::LedgerDump;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    Create(Vec<CreateItem>),
    Transactions(Transactions),
    Dump(DumpRequest),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateItem {
    Account {
        id: String,
        balance: Decimal,
    },
    Symbol {
        sym: String,
        #[serde(default)]
        accounts: Vec<ShareGrant>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShareGrant {
    pub id: String,
    pub shares: Decimal,
}

/// Orders, cancels and queries on behalf of one account
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transactions {
    pub id: String,
    pub items: Vec<TransactionItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionItem {
    Order {
        sym: String,
        amount: Decimal,
        limit: Decimal,
    },
    Cancel {
        id: OrderId,
    },
    Query {
        id: OrderId,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DumpRequest {
    #[serde(default)]
    pub rows: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub results: Vec<ResultItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultItem {
    Created {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sym: Option<String>,
    },
    Opened {
        id: OrderId,
        sym: String,
        amount: Decimal,
        limit: Decimal,
    },
    Canceled {
        id: OrderId,
        #[serde(flatten)]
        status: StatusBody,
    },
    Status {
        id: OrderId,
        #[serde(flatten)]
        status: StatusBody,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sym: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<Decimal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<Decimal>,
        reason: String,
    },
    Dump(LedgerDump),
}

/// Executions first, then at most one of `open` / `canceled`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBody {
    pub executed: Vec<Executed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Shares>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled: Option<Canceled>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Executed {
    pub shares: Decimal,
    pub price: Decimal,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shares {
    pub shares: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Canceled {
    pub shares: Decimal,
    pub time: i64,
}

impl From<&Fill> for Executed {
    fn from(fill: &Fill) -> Self {
        Self {
            shares: fill.shares,
            price: fill.price.as_decimal(),
            time: fill.time.timestamp(),
        }
    }
}

impl From<OrderStatusReport> for StatusBody {
    fn from(report: OrderStatusReport) -> Self {
        let executed = report.fills.iter().map(Executed::from).collect();
        let (open, canceled) = match report.state {
            ReportState::Open { shares } => (Some(Shares { shares }), None),
            ReportState::Cancelled(c) => (
                None,
                Some(Canceled {
                    shares: c.shares,
                    time: c.time.timestamp(),
                }),
            ),
            ReportState::Filled => (None, None),
        };
        Self {
            executed,
            open,
            canceled,
        }
    }
}

impl ResultItem {
    pub fn error(reason: impl Into<String>) -> Self {
        ResultItem::Error {
            id: None,
            sym: None,
            amount: None,
            limit: None,
            reason: reason.into(),
        }
    }
}

/// Decode and execute one request payload
pub fn handle(exchange: &Exchange, payload: &[u8], default_rows: usize) -> Response {
    let request: Request = match serde_json::from_slice(payload) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed request document");
            return Response {
                results: vec![ResultItem::error(format!("Malformed request: {e}"))],
            };
        }
    };

    let results = match request {
        Request::Create(items) => items
            .into_iter()
            .map(|item| create(exchange, item))
            .collect(),
        Request::Transactions(tx) => transactions(exchange, tx),
        Request::Dump(dump) => {
            let rows = dump.rows.unwrap_or(default_rows);
            vec![into_item(exchange.dispatch(Command::DumpState { row_limit: rows }))]
        }
    };
    debug!(results = results.len(), "Request handled");
    Response { results }
}

fn create(exchange: &Exchange, item: CreateItem) -> ResultItem {
    match item {
        CreateItem::Account { id, balance } => {
            match exchange.dispatch(Command::CreateAccount { id, balance }) {
                CommandResult::AccountCreated { id } => ResultItem::Created {
                    id: Some(id),
                    sym: None,
                },
                CommandResult::CreateFailed { target, reason } => ResultItem::Error {
                    id: Some(target),
                    sym: None,
                    amount: None,
                    limit: None,
                    reason,
                },
                other => into_item(other),
            }
        }
        CreateItem::Symbol { sym, accounts } => {
            let credits = accounts
                .into_iter()
                .map(|grant| SymbolCredit {
                    account_id: grant.id,
                    shares: grant.shares,
                })
                .collect();
            match exchange.dispatch(Command::CreateSymbol { name: sym, credits }) {
                CommandResult::SymbolCreated { name } => ResultItem::Created {
                    id: None,
                    sym: Some(name),
                },
                CommandResult::CreateFailed { target, reason } => ResultItem::Error {
                    id: None,
                    sym: Some(target),
                    amount: None,
                    limit: None,
                    reason,
                },
                other => into_item(other),
            }
        }
    }
}

fn transactions(exchange: &Exchange, tx: Transactions) -> Vec<ResultItem> {
    // Every item fails the same way for an unknown account
    let account = AccountId::try_new(tx.id.clone()).filter(|id| exchange.account(id).is_some());
    let Some(account) = account else {
        let reason = format!("Account with ID {} does not exist", tx.id);
        return tx
            .items
            .into_iter()
            .map(|item| match item {
                TransactionItem::Order { sym, amount, limit } => ResultItem::Error {
                    id: None,
                    sym: Some(sym),
                    amount: Some(amount),
                    limit: Some(limit),
                    reason: reason.clone(),
                },
                TransactionItem::Cancel { id } | TransactionItem::Query { id } => ResultItem::Error {
                    id: Some(id.to_string()),
                    sym: None,
                    amount: None,
                    limit: None,
                    reason: reason.clone(),
                },
            })
            .collect();
    };

    tx.items
        .into_iter()
        .map(|item| {
            let command = match item {
                TransactionItem::Order { sym, amount, limit } => Command::OpenOrder {
                    account_id: tx.id.clone(),
                    symbol: sym,
                    amount,
                    limit,
                },
                // Another account's order reads as unknown to this one
                TransactionItem::Cancel { id } | TransactionItem::Query { id }
                    if exchange.order_owner(id).is_some_and(|owner| owner != account) =>
                {
                    return ResultItem::Error {
                        id: Some(id.to_string()),
                        sym: None,
                        amount: None,
                        limit: None,
                        reason: format!("Order not found: {id}"),
                    };
                }
                TransactionItem::Cancel { id } => Command::CancelOrder { order_id: id },
                TransactionItem::Query { id } => Command::QueryOrder { order_id: id },
            };
            into_item(exchange.dispatch(command))
        })
        .collect()
}

fn into_item(result: CommandResult) -> ResultItem {
    match result {
        CommandResult::AccountCreated { id } => ResultItem::Created {
            id: Some(id),
            sym: None,
        },
        CommandResult::SymbolCreated { name } => ResultItem::Created {
            id: None,
            sym: Some(name),
        },
        CommandResult::CreateFailed { target, reason } => ResultItem::Error {
            id: Some(target),
            sym: None,
            amount: None,
            limit: None,
            reason,
        },
        CommandResult::Opened {
            order_id,
            symbol,
            amount,
            limit,
        } => ResultItem::Opened {
            id: order_id,
            sym: symbol,
            amount,
            limit,
        },
        CommandResult::OpenFailed {
            symbol,
            amount,
            limit,
            reason,
        } => ResultItem::Error {
            id: None,
            sym: Some(symbol),
            amount: Some(amount),
            limit: Some(limit),
            reason,
        },
        CommandResult::Cancelled { order_id, report } => ResultItem::Canceled {
            id: order_id,
            status: report.into(),
        },
        CommandResult::Status { order_id, report } => ResultItem::Status {
            id: order_id,
            status: report.into(),
        },
        CommandResult::OrderFailed { order_id, reason } => ResultItem::Error {
            id: Some(order_id.to_string()),
            sym: None,
            amount: None,
            limit: None,
            reason,
        },
        CommandResult::Dump(dump) => ResultItem::Dump(dump),
    }
}
