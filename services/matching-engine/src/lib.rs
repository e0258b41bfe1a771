//! Matching Engine Service
//!
//! Limit-order matching with price-time priority for an equity exchange.
//! Orders for every symbol are matched under one process-wide lock; account,
//! position and order state lives in a concurrent cache that writes behind
//! to the ledger.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced
//! - Execution at the resting order's limit
//! - No book is ever left crossed
//! - Conservation of cash and shares

pub mod book;
pub mod cache;
pub mod dispatcher;
pub mod engine;
pub mod exchange;
pub mod lifecycle;
pub mod matching;

pub use cache::FastCache;
pub use engine::{MatchingEngine, SubmitResult};
pub use exchange::{AccountView, Exchange};
pub use lifecycle::OrderLifecycle;
