//! Price level implementation with FIFO queue
//!
//! A price level holds every resting order at one limit price, oldest first,
//! which gives time priority among equal prices.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;

#[derive(Debug, Clone)]
pub struct PriceLevel {
    orders: VecDeque<LevelEntry>,
    total_quantity: Quantity,
}

#[derive(Debug, Clone)]
struct LevelEntry {
    order_id: OrderId,
    remaining: Quantity,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Queue an order behind everything already at this price
    pub fn insert(&mut self, order_id: OrderId, quantity: Quantity) {
        self.orders.push_back(LevelEntry {
            order_id,
            remaining: quantity,
        });
        self.total_quantity = self.total_quantity + quantity;
    }

    /// Remove an order wherever it sits; returns its remaining quantity
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Quantity> {
        let position = self.orders.iter().position(|e| &e.order_id == order_id)?;
        let entry = self.orders.remove(position)?;
        self.total_quantity = self.total_quantity - entry.remaining;
        Some(entry.remaining)
    }

    /// Oldest order at this level
    pub fn peek_front(&self) -> Option<(OrderId, Quantity)> {
        self.orders.front().map(|e| (e.order_id, e.remaining))
    }

    /// Take `quantity` from the front order, dropping it once exhausted.
    ///
    /// Returns the front order's new remainder.
    pub fn reduce_front(&mut self, quantity: Quantity) -> Option<Quantity> {
        let entry = self.orders.front_mut()?;
        let taken = quantity.min(entry.remaining);
        entry.remaining = entry.remaining - taken;
        let left = entry.remaining;
        if left.is_zero() {
            self.orders.pop_front();
        }
        self.total_quantity = self.total_quantity - taken;
        Some(left)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Order ids in queue order
    pub fn order_ids(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.orders.iter().map(|e| e.order_id)
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}
