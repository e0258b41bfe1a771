//! Crossing detection logic
//!
//! Determines when a bid and ask can match based on price compatibility

use types::numeric::Price;
use types::order::Side;

/// A bid and an ask trade when the bid is at or above the ask
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if an incoming order's limit reaches a resting order's limit
pub fn incoming_can_match(incoming_side: Side, incoming_limit: Price, resting_limit: Price) -> bool {
    match incoming_side {
        Side::Buy => can_match(incoming_limit, resting_limit),
        Side::Sell => can_match(resting_limit, incoming_limit),
    }
}
