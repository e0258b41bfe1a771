//! Error types for the exchange
//!
//! Comprehensive error taxonomy using thiserror. The `Display` strings double
//! as the reason text returned to clients, so they are kept short.

use crate::ids::{AccountId, OrderId, Symbol};
use crate::numeric::Quantity;
use crate::order::OrderStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level exchange error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

impl ExchangeError {
    /// True for errors a client should read as "no such live order"
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExchangeError::Order(e) if e.is_not_found())
    }
}

/// Account-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountError {
    #[error("Duplicate account: {account_id}")]
    Duplicate { account_id: AccountId },

    #[error("Account with ID {account_id} does not exist")]
    NotFound { account_id: AccountId },

    #[error("Account ID must not be blank")]
    InvalidId,

    #[error("Opening balance must not be negative: {balance}")]
    NegativeBalance { balance: Decimal },

    #[error("Amount out of range for account {account_id}")]
    AmountOverflow { account_id: AccountId },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Insufficient shares of {symbol}: required {required}, available {available}")]
    InsufficientShares {
        symbol: Symbol,
        required: Quantity,
        available: Decimal,
    },
}

/// Order-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {order_id}")]
    NotFound { order_id: OrderId },

    #[error("Order {order_id} is already {status}")]
    Closed { order_id: OrderId, status: OrderStatus },

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Fill of {shares} exceeds remaining {remaining} on order {order_id}")]
    Overfill {
        order_id: OrderId,
        shares: Quantity,
        remaining: Quantity,
    },

    #[error("Malformed order data for {order_id}: {detail}")]
    MalformedData { order_id: OrderId, detail: String },
}

impl OrderError {
    /// `Closed` is reported in the same class as `NotFound`: the order is no
    /// longer live, whether it ever existed or not.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OrderError::NotFound { .. } | OrderError::Closed { .. })
    }
}

/// Symbol-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymbolError {
    #[error("Symbol name must not be blank")]
    InvalidName,

    #[error("Invalid share credit for {account_id}: {shares}")]
    InvalidCredit { account_id: String, shares: Decimal },
}
