//! Account and balance types
//!
//! A single-currency cash account. The balance is only required to be
//! non-negative when an order is checked against it; credits and debits
//! only fail when the result is not representable.

use crate::errors::AccountError;
use crate::ids::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cash account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Decimal,
}

impl Account {
    /// Open an account, rejecting a negative starting balance
    pub fn open(id: AccountId, balance: Decimal) -> Result<Self, AccountError> {
        if balance.is_sign_negative() && !balance.is_zero() {
            return Err(AccountError::NegativeBalance { balance });
        }
        Ok(Self {
            id,
            balance: balance.normalize(),
        })
    }

    /// Credit to balance (e.g., sale proceeds, refund)
    pub fn credit(&mut self, amount: Decimal) -> Result<(), AccountError> {
        self.balance = self.balance_after(amount)?;
        Ok(())
    }

    /// Debit from balance (e.g., reservation, purchase)
    pub fn debit(&mut self, amount: Decimal) -> Result<(), AccountError> {
        self.credit(-amount)
    }

    /// Balance after crediting `amount`, leaving the account untouched
    pub fn balance_after(&self, amount: Decimal) -> Result<Decimal, AccountError> {
        self.balance
            .checked_add(amount)
            .map(|balance| balance.normalize())
            .ok_or_else(|| AccountError::AmountOverflow {
                account_id: self.id.clone(),
            })
    }

    /// Check that `required` can be paid out of the current balance
    pub fn ensure_funds(&self, required: Decimal) -> Result<(), AccountError> {
        if required <= self.balance {
            Ok(())
        } else {
            Err(AccountError::InsufficientFunds {
                required,
                available: self.balance,
            })
        }
    }
}
