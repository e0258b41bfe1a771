//! Order book infrastructure module
//!
//! Contains price levels, bid book, and ask book implementations, plus the
//! per-symbol pair of them.

pub mod price_level;
pub mod bid_book;
pub mod ask_book;

pub use price_level::PriceLevel;
pub use bid_book::BidBook;
pub use ask_book::AskBook;

use serde::Serialize;
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::Side;

/// Both sides of one symbol's book
#[derive(Debug, Clone)]
pub struct OrderBook {
    pub symbol: Symbol,
    pub bids: BidBook,
    pub asks: AskBook,
}

impl OrderBook {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: BidBook::new(),
            asks: AskBook::new(),
        }
    }

    /// Rest an order on its own side
    pub fn park(&mut self, side: Side, order_id: OrderId, limit: Price, remaining: Quantity) {
        match side {
            Side::Buy => self.bids.insert(order_id, limit, remaining),
            Side::Sell => self.asks.insert(order_id, limit, remaining),
        }
    }

    pub fn remove(&mut self, side: Side, order_id: &OrderId, limit: Price) -> bool {
        match side {
            Side::Buy => self.bids.remove(order_id, limit),
            Side::Sell => self.asks.remove(order_id, limit),
        }
    }

    /// Best resting order an incoming order of `side` would trade against
    pub fn best_opposite(&self, side: Side) -> Option<(Price, OrderId, Quantity)> {
        match side {
            Side::Buy => self.asks.best_order(),
            Side::Sell => self.bids.best_order(),
        }
    }

    pub fn reduce_best_opposite(&mut self, side: Side, quantity: Quantity) -> Option<Quantity> {
        match side {
            Side::Buy => self.asks.reduce_best(quantity),
            Side::Sell => self.bids.reduce_best(quantity),
        }
    }

    /// True if a bid rests at or above the best ask
    pub fn is_crossed(&self) -> bool {
        match (self.bids.best_bid_price(), self.asks.best_ask_price()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.bids.order_ids().contains(&order_id) || self.asks.order_ids().contains(&order_id)
    }

    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        BookSnapshot {
            symbol: self.symbol.clone(),
            bids: self.bids.depth_snapshot(depth),
            asks: self.asks.depth_snapshot(depth),
        }
    }
}

/// Aggregated depth of one symbol, best levels first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}
