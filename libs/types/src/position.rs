//! Share holdings per (account, symbol)
//!
//! Positions are only ever incremented; a sale or reservation is a negative
//! increment. A missing position reads as zero shares.

use crate::errors::AccountError;
use crate::ids::{AccountId, Symbol};
use crate::numeric::Quantity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Composite key of a position
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub account_id: AccountId,
    pub symbol: Symbol,
}

impl PositionKey {
    pub fn new(account_id: AccountId, symbol: Symbol) -> Self {
        Self { account_id, symbol }
    }
}

/// Shares of one symbol held by one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub account_id: AccountId,
    pub symbol: Symbol,
    pub amount: Decimal,
}

impl Position {
    /// Empty position, as implied by an absent row
    pub fn empty(key: &PositionKey) -> Self {
        Self {
            account_id: key.account_id.clone(),
            symbol: key.symbol.clone(),
            amount: Decimal::ZERO,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.account_id.clone(), self.symbol.clone())
    }

    /// Add `delta` shares (negative to remove)
    pub fn increment(&mut self, delta: Decimal) -> Result<(), AccountError> {
        self.amount = self.amount_after(delta)?;
        Ok(())
    }

    /// Holding after adding `delta`, leaving the position untouched
    pub fn amount_after(&self, delta: Decimal) -> Result<Decimal, AccountError> {
        self.amount
            .checked_add(delta)
            .map(|amount| amount.normalize())
            .ok_or_else(|| AccountError::AmountOverflow {
                account_id: self.account_id.clone(),
            })
    }

    /// Check that `required` shares can be taken from this position
    pub fn ensure_shares(&self, required: Quantity) -> Result<(), AccountError> {
        if required.as_decimal() <= self.amount {
            Ok(())
        } else {
            Err(AccountError::InsufficientShares {
                symbol: self.symbol.clone(),
                required,
                available: self.amount,
            })
        }
    }
}
