//! Order lifecycle types
//!
//! An order's side is carried by the sign of its amount: positive buys,
//! negative sells. The remaining amount keeps that sign and moves toward
//! zero with every fill.
//!
//! ```text
//! Open ──fill──▶ PartiallyFilled ──fill──▶ Filled
//!   │                  │
//!   └──────cancel──────┴──────────────────▶ Cancelled
//! ```

use crate::errors::{AccountError, OrderError};
use crate::ids::{AccountId, OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Side implied by a signed amount; zero has no side
    pub fn from_amount(amount: Decimal) -> Option<Self> {
        if amount > Decimal::ZERO {
            Some(Side::Buy)
        } else if amount < Decimal::ZERO {
            Some(Side::Sell)
        } else {
            None
        }
    }

    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Apply this side's sign to a share count
    pub fn signed(&self, shares: Quantity) -> Decimal {
        match self {
            Side::Buy => shares.as_decimal(),
            Side::Sell => -shares.as_decimal(),
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, nothing executed yet
    Open,
    /// Some shares executed, remainder still in the book
    PartiallyFilled,
    /// Completely executed (terminal)
    Filled,
    /// Cancelled by the client (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Open => "open",
            OrderStatus::PartiallyFilled => "partially filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One execution against an order, signed like the order's amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub shares: Decimal,
    pub price: Price,
    pub time: DateTime<Utc>,
}

/// Remainder released by a cancel, signed like the order's amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cancellation {
    pub shares: Decimal,
    pub time: DateTime<Utc>,
}

/// Limit order with its fill history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub limit: Price,
    pub original_amount: Decimal,
    pub remaining_amount: Decimal,
    pub fills: Vec<Fill>,
    pub status: OrderStatus,
    pub cancellation: Option<Cancellation>,
    pub opened_at: DateTime<Utc>,
}

impl Order {
    /// Create a new open order
    pub fn open(
        id: OrderId,
        account_id: AccountId,
        symbol: Symbol,
        amount: Decimal,
        limit: Price,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if amount.is_zero() {
            return Err(OrderError::InvalidAmount(amount.to_string()));
        }
        Ok(Self {
            id,
            account_id,
            symbol,
            limit,
            original_amount: amount,
            remaining_amount: amount,
            fills: Vec::new(),
            status: OrderStatus::Open,
            cancellation: None,
            opened_at: timestamp,
        })
    }

    /// Rebuild a live order from its persisted remainder and fill history.
    ///
    /// The original amount is recovered as remainder plus fills; every fill
    /// must carry the remainder's sign.
    pub fn restore(
        id: OrderId,
        account_id: AccountId,
        symbol: Symbol,
        remaining_amount: Decimal,
        limit: Price,
        fills: Vec<Fill>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let side = Side::from_amount(remaining_amount).ok_or_else(|| OrderError::MalformedData {
            order_id: id,
            detail: "open order with zero remainder".to_string(),
        })?;
        if let Some(bad) = fills.iter().find(|f| Side::from_amount(f.shares) != Some(side)) {
            return Err(OrderError::MalformedData {
                order_id: id,
                detail: format!("fill of {} does not match {:?} side", bad.shares, side),
            });
        }

        let executed: Decimal = fills.iter().map(|f| f.shares).sum();
        let status = if fills.is_empty() {
            OrderStatus::Open
        } else {
            OrderStatus::PartiallyFilled
        };

        Ok(Self {
            id,
            account_id,
            symbol,
            limit,
            original_amount: remaining_amount + executed,
            remaining_amount,
            fills,
            status,
            cancellation: None,
            opened_at: timestamp,
        })
    }

    pub fn side(&self) -> Side {
        if self.original_amount.is_sign_negative() {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    /// Unexecuted shares (magnitude)
    pub fn remaining(&self) -> Quantity {
        Quantity::abs_of(self.remaining_amount)
    }

    /// Shares originally requested (magnitude)
    pub fn original(&self) -> Quantity {
        Quantity::abs_of(self.original_amount)
    }

    /// Sum of executed shares (magnitude)
    pub fn filled(&self) -> Quantity {
        Quantity::abs_of(self.fills.iter().map(|f| f.shares.abs()).sum())
    }

    /// Check quantity invariant: filled + remaining = original
    pub fn check_invariant(&self) -> bool {
        self.filled().as_decimal() + self.remaining().as_decimal() == self.original().as_decimal()
    }

    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Cash held against the unexecuted part of a buy order
    pub fn reserved_funds(&self) -> Result<Decimal, AccountError> {
        match self.side() {
            Side::Buy => self.limit.notional(self.remaining()).ok_or_else(|| {
                AccountError::AmountOverflow {
                    account_id: self.account_id.clone(),
                }
            }),
            Side::Sell => Ok(Decimal::ZERO),
        }
    }

    /// Record an execution of `shares` at `price`
    pub fn add_fill(
        &mut self,
        shares: Quantity,
        price: Price,
        timestamp: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::Closed {
                order_id: self.id,
                status: self.status,
            });
        }
        if shares.is_zero() {
            return Err(OrderError::InvalidAmount(shares.to_string()));
        }
        let remaining = self.remaining();
        if shares > remaining {
            return Err(OrderError::Overfill {
                order_id: self.id,
                shares,
                remaining,
            });
        }

        let signed = self.side().signed(shares);
        self.remaining_amount -= signed;
        self.fills.push(Fill {
            shares: signed,
            price,
            time: timestamp,
        });

        self.status = if self.remaining_amount.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        Ok(())
    }

    /// Cancel the unexecuted remainder
    pub fn cancel(&mut self, timestamp: DateTime<Utc>) -> Result<Cancellation, OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::Closed {
                order_id: self.id,
                status: self.status,
            });
        }

        let cancellation = Cancellation {
            shares: self.remaining_amount,
            time: timestamp,
        };
        self.remaining_amount = Decimal::ZERO;
        self.status = OrderStatus::Cancelled;
        self.cancellation = Some(cancellation.clone());
        Ok(cancellation)
    }

    /// Snapshot of fills plus the open/cancelled marker
    pub fn report(&self) -> OrderStatusReport {
        let state = match (&self.cancellation, self.status) {
            (Some(c), _) => ReportState::Cancelled(c.clone()),
            (None, OrderStatus::Filled) => ReportState::Filled,
            (None, _) => ReportState::Open {
                shares: self.remaining_amount,
            },
        };
        OrderStatusReport {
            fills: self.fills.clone(),
            state,
        }
    }
}

/// Trailing marker of a status report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Open { shares: Decimal },
    Cancelled(Cancellation),
    Filled,
}

/// Answer to a query or cancel: executions in order, then at most one marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub fills: Vec<Fill>,
    pub state: ReportState,
}

impl OrderStatusReport {
    pub fn open_shares(&self) -> Option<Decimal> {
        match self.state {
            ReportState::Open { shares } => Some(shares),
            _ => None,
        }
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        match &self.state {
            ReportState::Cancelled(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn buy(amount: i64, limit: u64) -> Order {
        Order::open(
            OrderId::new(1),
            AccountId::new("A1"),
            Symbol::new("SPY"),
            Decimal::from(amount),
            Price::from_u64(limit),
            ts(1_700_000_000),
        )
        .unwrap()
    }

    #[test]
    fn test_side_from_amount() {
        assert_eq!(Side::from_amount(Decimal::from(3)), Some(Side::Buy));
        assert_eq!(Side::from_amount(Decimal::from(-3)), Some(Side::Sell));
        assert_eq!(Side::from_amount(Decimal::ZERO), None);
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }

    #[test]
    fn test_open_rejects_zero_amount() {
        let result = Order::open(
            OrderId::new(1),
            AccountId::new("A1"),
            Symbol::new("SPY"),
            Decimal::ZERO,
            Price::from_u64(10),
            ts(0),
        );
        assert!(matches!(result, Err(OrderError::InvalidAmount(_))));
    }

    #[test]
    fn test_buy_fill_progression() {
        let mut order = buy(10, 6);
        assert_eq!(order.reserved_funds(), Ok(Decimal::from(60)));

        order.add_fill(Quantity::from_u64(4), Price::from_u64(5), ts(1)).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_amount, Decimal::from(6));
        assert!(order.check_invariant());

        order.add_fill(Quantity::from_u64(6), Price::from_u64(5), ts(2)).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.remaining_amount, Decimal::ZERO);
        assert!(order.check_invariant());
        assert_eq!(order.report().state, ReportState::Filled);
    }

    #[test]
    fn test_sell_fill_moves_toward_zero() {
        let mut order = Order::open(
            OrderId::new(2),
            AccountId::new("A2"),
            Symbol::new("SPY"),
            Decimal::from(-10),
            Price::from_u64(5),
            ts(0),
        )
        .unwrap();
        assert_eq!(order.side(), Side::Sell);
        assert_eq!(order.reserved_funds(), Ok(Decimal::ZERO));

        order.add_fill(Quantity::from_u64(3), Price::from_u64(5), ts(1)).unwrap();
        assert_eq!(order.remaining_amount, Decimal::from(-7));
        assert_eq!(order.fills[0].shares, Decimal::from(-3));
        assert!(order.check_invariant());
    }

    #[test]
    fn test_overfill_rejected() {
        let mut order = buy(2, 6);
        let err = order.add_fill(Quantity::from_u64(3), Price::from_u64(6), ts(1)).unwrap_err();
        assert!(matches!(err, OrderError::Overfill { .. }));
        assert_eq!(order.remaining_amount, Decimal::from(2));
        assert!(order.fills.is_empty());
    }

    #[test]
    fn test_cancel_records_remainder() {
        let mut order = buy(10, 6);
        order.add_fill(Quantity::from_u64(4), Price::from_u64(6), ts(1)).unwrap();

        let cancellation = order.cancel(ts(2)).unwrap();
        assert_eq!(cancellation.shares, Decimal::from(6));
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.remaining_amount, Decimal::ZERO);
        assert_eq!(order.filled(), Quantity::from_u64(4));

        let report = order.report();
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.cancellation().map(|c| c.shares), Some(Decimal::from(6)));
        assert_eq!(report.open_shares(), None);
    }

    #[test]
    fn test_cancel_terminal_rejected() {
        let mut order = buy(1, 6);
        order.add_fill(Quantity::from_u64(1), Price::from_u64(6), ts(1)).unwrap();
        let err = order.cancel(ts(2)).unwrap_err();
        assert_eq!(
            err,
            OrderError::Closed {
                order_id: OrderId::new(1),
                status: OrderStatus::Filled
            }
        );

        let mut cancelled = buy(1, 6);
        cancelled.cancel(ts(1)).unwrap();
        assert!(cancelled.cancel(ts(2)).unwrap_err().is_not_found());
        assert!(cancelled.add_fill(Quantity::from_u64(1), Price::from_u64(6), ts(3)).is_err());
    }

    #[test]
    fn test_open_report() {
        let order = buy(5, 10);
        let report = order.report();
        assert!(report.fills.is_empty());
        assert_eq!(report.open_shares(), Some(Decimal::from(5)));
    }

    #[test]
    fn test_restore_rebuilds_original_amount() {
        let fills = vec![Fill {
            shares: Decimal::from(-4),
            price: Price::from_u64(5),
            time: ts(1),
        }];
        let order = Order::restore(
            OrderId::new(9),
            AccountId::new("A2"),
            Symbol::new("SPY"),
            Decimal::from(-6),
            Price::from_u64(5),
            fills,
            ts(2),
        )
        .unwrap();
        assert_eq!(order.original_amount, Decimal::from(-10));
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert!(order.check_invariant());
    }

    #[test]
    fn test_restore_rejects_mismatched_fill() {
        let fills = vec![Fill {
            shares: Decimal::from(4),
            price: Price::from_u64(5),
            time: ts(1),
        }];
        let result = Order::restore(
            OrderId::new(9),
            AccountId::new("A2"),
            Symbol::new("SPY"),
            Decimal::from(-6),
            Price::from_u64(5),
            fills,
            ts(2),
        );
        assert!(matches!(result, Err(OrderError::MalformedData { .. })));
    }

    #[test]
    fn test_order_serialization() {
        let order = buy(3, 7);
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}

// ── Property-Based Tests ────────────────────────────────────────────

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_fills_account_for_every_share(
            original in 1u64..500,
            sell in any::<bool>(),
            chunks in proptest::collection::vec(1u64..50, 1..30),
        ) {
            let amount = if sell { -Decimal::from(original) } else { Decimal::from(original) };
            let mut order = Order::open(
                OrderId::new(1),
                AccountId::new("A1"),
                Symbol::new("SPY"),
                amount,
                Price::from_u64(10),
                Utc::now(),
            ).unwrap();

            for chunk in chunks {
                let before = order.remaining();
                let step = Quantity::from_u64(chunk).min(before);
                if step.is_zero() {
                    break;
                }
                order.add_fill(step, Price::from_u64(10), Utc::now()).unwrap();

                prop_assert!(order.check_invariant());
                prop_assert!(order.remaining() < before);
                prop_assert_eq!(order.side(), if sell { Side::Sell } else { Side::Buy });
            }

            prop_assert_eq!(order.remaining().is_zero(), order.status == OrderStatus::Filled);
        }
    }
}
