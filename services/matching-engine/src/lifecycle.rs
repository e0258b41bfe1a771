//! Order lifecycle manager
//!
//! Cancel and query by order id. A cancel releases the remainder's
//! reservation: cash for a buy, shares for a sell.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use types::errors::{ExchangeError, OrderError};
use types::ids::OrderId;
use types::order::{OrderStatusReport, Side};
use types::position::PositionKey;

use crate::cache::FastCache;

pub struct OrderLifecycle {
    cache: Arc<FastCache>,
}

impl OrderLifecycle {
    pub fn new(cache: Arc<FastCache>) -> Self {
        Self { cache }
    }

    /// Cancel a live order and return its post-cancel report.
    ///
    /// A terminal order yields `OrderError::Closed` and is not refunded again.
    pub fn cancel_order(&self, order_id: OrderId) -> Result<OrderStatusReport, ExchangeError> {
        let mut books = self.cache.lock_books();

        let order = self
            .cache
            .order(order_id)
            .ok_or(OrderError::NotFound { order_id })?;
        if order.status.is_terminal() {
            return Err(OrderError::Closed {
                order_id,
                status: order.status,
            }
            .into());
        }

        let side = order.side();
        let remaining = order.remaining();
        let refund = order.reserved_funds()?;
        let key = PositionKey::new(order.account_id.clone(), order.symbol.clone());
        match side {
            Side::Buy => self.cache.check_credit(&order.account_id, refund)?,
            Side::Sell => self.cache.check_position_credit(&key, remaining.as_decimal())?,
        }

        let cancellation = self
            .cache
            .with_order_mut(order_id, |order| {
                let cancellation = order.cancel(Utc::now())?;
                self.cache.delete_open_order(side, order_id);
                Ok::<_, OrderError>(cancellation)
            })
            .ok_or(OrderError::NotFound { order_id })??;

        if let Some(book) = books.get_mut(&order.symbol) {
            book.remove(side, &order_id, order.limit);
        }
        match side {
            Side::Buy => {
                self.cache.adjust_balance(&order.account_id, refund)?;
            }
            Side::Sell => {
                self.cache.adjust_position(&key, remaining.as_decimal())?;
            }
        }
        drop(books);

        info!(
            order_id = %order_id,
            account_id = %order.account_id,
            shares = %cancellation.shares,
            "Order cancelled"
        );
        self.query_order(order_id)
    }

    /// Fill history plus the open/cancelled marker
    pub fn query_order(&self, order_id: OrderId) -> Result<OrderStatusReport, ExchangeError> {
        self.cache
            .order(order_id)
            .map(|order| order.report())
            .ok_or_else(|| OrderError::NotFound { order_id }.into())
    }
}
