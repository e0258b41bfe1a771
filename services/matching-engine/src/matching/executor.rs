//! Trade execution logic
//!
//! One call performs one matching step: both fill histories, the resting
//! book entry, the buyer's position, both balances and the transaction row.
//! The caller holds the match lock for the whole step.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use types::errors::{AccountError, ExchangeError, OrderError};
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::position::PositionKey;
use types::trade::Execution;

use crate::book::OrderBook;
use crate::cache::FastCache;

/// Match executor for handling trade generation
pub struct MatchExecutor {
    cache: Arc<FastCache>,
}

impl MatchExecutor {
    pub fn new(cache: Arc<FastCache>) -> Self {
        Self { cache }
    }

    /// Execute `shares` between `incoming` and the best resting order of
    /// `book` at `price` (the resting limit).
    ///
    /// `incoming` is the caller's working copy; writing it back to the cache
    /// is the caller's job.
    pub fn execute(
        &self,
        book: &mut OrderBook,
        incoming: &mut Order,
        resting_id: OrderId,
        price: Price,
        shares: Quantity,
        timestamp: DateTime<Utc>,
    ) -> Result<Execution, ExchangeError> {
        let side = incoming.side();

        // Every credit of the step must fit before anything moves
        let resting_account = self
            .cache
            .order(resting_id)
            .map(|order| order.account_id)
            .ok_or(OrderError::NotFound { order_id: resting_id })?;
        let (buyer, seller) = match side {
            Side::Buy => (&incoming.account_id, &resting_account),
            Side::Sell => (&resting_account, &incoming.account_id),
        };
        let value = price
            .notional(shares)
            .ok_or_else(|| AccountError::AmountOverflow { account_id: buyer.clone() })?;
        let buyer_key = PositionKey::new(buyer.clone(), book.symbol.clone());
        self.cache.check_credit(seller, value)?;
        self.cache.check_position_credit(&buyer_key, shares.as_decimal())?;

        // Resting order first: an error here leaves nothing mutated
        let resting = self
            .cache
            .with_order_mut(resting_id, |resting| -> Result<Order, OrderError> {
                resting.add_fill(shares, price, timestamp)?;
                if resting.is_live() {
                    self.cache.write_open_order(resting);
                } else {
                    self.cache.delete_open_order(resting.side(), resting.id);
                }
                Ok(resting.clone())
            })
            .ok_or(OrderError::NotFound { order_id: resting_id })??;
        incoming.add_fill(shares, price, timestamp)?;
        book.reduce_best_opposite(side, shares);

        let (buy, sell) = match side {
            Side::Buy => (&*incoming, &resting),
            Side::Sell => (&resting, &*incoming),
        };

        self.cache.adjust_position(&buyer_key, shares.as_decimal())?;
        self.cache.adjust_balance(&sell.account_id, value)?;
        if side == Side::Buy {
            // A resting buy already reserved `shares × price` at its own limit
            self.cache.adjust_balance(&buy.account_id, -value)?;
        }

        let execution = Execution {
            sequence: self.cache.next_execution_sequence(),
            symbol: book.symbol.clone(),
            buy_order: buy.id,
            sell_order: sell.id,
            buyer: buy.account_id.clone(),
            seller: sell.account_id.clone(),
            price,
            shares,
            executed_at: timestamp,
        };
        self.cache.record_execution(&execution);

        if execution.is_self_trade() {
            debug!(account_id = %execution.buyer, sequence = execution.sequence, "Self-trade executed");
        }
        Ok(execution)
    }
}
