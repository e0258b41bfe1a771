//! Matching engine core
//!
//! Validates an incoming limit order, then matches it against the opposite
//! side of its symbol's book under the match lock. Any remainder rests.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::errors::{AccountError, ExchangeError, OrderError};
use types::ids::{AccountId, OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::position::PositionKey;
use types::trade::Execution;

use crate::book::{BookSnapshot, OrderBook};
use crate::cache::FastCache;
use crate::matching::{crossing, MatchExecutor};

/// Main matching engine
pub struct MatchingEngine {
    cache: Arc<FastCache>,
    executor: MatchExecutor,
}

/// Result of submitting an order
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResult {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub amount: Decimal,
    pub limit: Price,
    /// Signed unexecuted remainder; zero when fully filled
    pub remaining: Decimal,
    pub status: OrderStatus,
    pub executions: Vec<Execution>,
}

impl SubmitResult {
    pub fn is_resting(&self) -> bool {
        !self.remaining.is_zero()
    }

    pub fn filled(&self) -> Quantity {
        self.executions
            .iter()
            .fold(Quantity::zero(), |acc, e| acc + e.shares)
    }
}

impl MatchingEngine {
    pub fn new(cache: Arc<FastCache>) -> Self {
        Self {
            executor: MatchExecutor::new(cache.clone()),
            cache,
        }
    }

    /// Submit a limit order; positive `amount` buys, negative sells.
    ///
    /// A rejected order still consumes an id.
    pub fn submit_order(
        &self,
        account_id: &AccountId,
        symbol: &Symbol,
        amount: Decimal,
        limit: Price,
    ) -> Result<SubmitResult, ExchangeError> {
        let side = Side::from_amount(amount)
            .ok_or_else(|| OrderError::InvalidAmount(amount.to_string()))?;
        if !self.cache.hydrate_account(account_id) {
            return Err(AccountError::NotFound {
                account_id: account_id.clone(),
            }
            .into());
        }
        self.cache.ensure_symbol(symbol);
        let order_id = self.cache.next_order_id();
        let shares = Quantity::abs_of(amount);
        let position_key = PositionKey::new(account_id.clone(), symbol.clone());

        let mut books = self.cache.lock_books();

        // Reject before anything is mutated
        match side {
            Side::Buy => {
                let required = limit.notional(shares).ok_or_else(|| AccountError::AmountOverflow {
                    account_id: account_id.clone(),
                })?;
                self.cache.ensure_funds(account_id, required)?
            }
            Side::Sell => self.cache.ensure_shares(&position_key, shares)?,
        }

        let now = Utc::now();
        let mut order = Order::open(order_id, account_id.clone(), symbol.clone(), amount, limit, now)?;
        if side == Side::Sell {
            self.cache.adjust_position(&position_key, -shares.as_decimal())?;
        }
        self.cache.insert_order(order.clone());

        let book = books
            .entry(symbol.clone())
            .or_insert_with(|| OrderBook::new(symbol.clone()));

        let mut executions = Vec::new();
        let mut halted = false;
        while !order.remaining().is_zero() {
            let Some((resting_price, resting_id, resting_remaining)) = book.best_opposite(side) else {
                break;
            };
            if !crossing::incoming_can_match(side, limit, resting_price) {
                break;
            }

            let quantity = order.remaining().min(resting_remaining);
            let execution = match self
                .executor
                .execute(book, &mut order, resting_id, resting_price, quantity, now)
            {
                Ok(execution) => execution,
                // The step moved nothing; the book cannot be left crossed, so
                // the remainder is cancelled below instead of resting
                Err(ExchangeError::Account(e @ AccountError::AmountOverflow { .. })) => {
                    warn!(order_id = %order_id, resting_order = %resting_id, error = %e, "Match step out of range");
                    halted = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            self.cache.with_order_mut(order_id, |cached| *cached = order.clone());

            info!(
                symbol = %symbol,
                sequence = execution.sequence,
                buy_order = %execution.buy_order,
                sell_order = %execution.sell_order,
                price = %execution.price,
                shares = %execution.shares,
                "Orders matched"
            );
            executions.push(execution);
        }

        if halted {
            let remaining = order.remaining();
            order.cancel(now)?;
            self.cache.with_order_mut(order_id, |cached| *cached = order.clone());
            if side == Side::Sell {
                self.cache.adjust_position(&position_key, remaining.as_decimal())?;
            }
        } else if !order.remaining().is_zero() {
            book.park(side, order_id, limit, order.remaining());
            if side == Side::Buy {
                self.cache.adjust_balance(account_id, -order.reserved_funds()?)?;
            }
            self.cache.write_open_order(&order);
            debug!(order_id = %order_id, remaining = %order.remaining_amount, "Remainder parked");
        }
        drop(books);

        info!(
            order_id = %order_id,
            account_id = %account_id,
            symbol = %symbol,
            amount = %amount,
            limit = %limit,
            executions = executions.len(),
            "Order opened"
        );

        Ok(SubmitResult {
            order_id,
            symbol: symbol.clone(),
            amount,
            limit,
            remaining: order.remaining_amount,
            status: order.status,
            executions,
        })
    }

    /// Aggregated depth of one symbol's book
    pub fn book_snapshot(&self, symbol: &Symbol, depth: usize) -> Option<BookSnapshot> {
        self.cache
            .lock_books()
            .get(symbol)
            .map(|book| book.snapshot(depth))
    }

    /// True if any book has a bid at or above its best ask
    pub fn any_crossed(&self) -> bool {
        self.cache.lock_books().values().any(OrderBook::is_crossed)
    }
}
