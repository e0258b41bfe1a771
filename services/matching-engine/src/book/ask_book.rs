//! Ask (sell-side) order book
//!
//! Sell orders keyed by limit price; the best ask is the lowest price, read
//! from the front of the BTreeMap.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::price_level::PriceLevel;

#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, order_id: OrderId, price: Price, quantity: Quantity) {
        self.levels
            .entry(price)
            .or_default()
            .insert(order_id, quantity);
    }

    /// Remove an order; empty levels are dropped
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        let Some(level) = self.levels.get_mut(&price) else {
            return false;
        };
        if level.remove(order_id).is_none() {
            return false;
        }
        if level.is_empty() {
            self.levels.remove(&price);
        }
        true
    }

    /// Lowest ask price with the total quantity resting there
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    pub fn best_ask_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Oldest order at the best ask: (price, order id, remaining)
    pub fn best_order(&self) -> Option<(Price, OrderId, Quantity)> {
        let (price, level) = self.levels.iter().next()?;
        let (order_id, remaining) = level.peek_front()?;
        Some((*price, order_id, remaining))
    }

    /// Fill `quantity` from the best order; returns its new remainder
    pub fn reduce_best(&mut self, quantity: Quantity) -> Option<Quantity> {
        let mut entry = self.levels.first_entry()?;
        let left = entry.get_mut().reduce_front(quantity)?;
        if entry.get().is_empty() {
            entry.remove();
        }
        Some(left)
    }

    /// Top `depth` levels, best first
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// Every resting order id in priority order
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.levels
            .values()
            .flat_map(|level| level.order_ids())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn order_count(&self) -> usize {
        self.levels.values().map(PriceLevel::order_count).sum()
    }
}
