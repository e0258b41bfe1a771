//! Exchange service
//!
//! Wires the cache, the ledger writer, the matching engine and the lifecycle
//! manager together. Built explicitly and shared behind an `Arc`.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use types::command::SymbolCredit;
use types::errors::{AccountError, ExchangeError, OrderError, SymbolError};
use types::ids::{AccountId, OrderId, Symbol};
use types::numeric::Price;
use types::order::OrderStatusReport;
use types::position::{Position, PositionKey};
use types::records::LedgerDump;

use ledger::{FlushReport, LedgerStore, LedgerWriter, MemoryLedger, WriterStats};

use crate::book::BookSnapshot;
use crate::cache::{FastCache, WarmupReport};
use crate::engine::{MatchingEngine, SubmitResult};
use crate::lifecycle::OrderLifecycle;

pub struct Exchange {
    cache: Arc<FastCache>,
    engine: MatchingEngine,
    lifecycle: OrderLifecycle,
    writer: Arc<LedgerWriter>,
}

/// Balance and holdings of one account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub balance: Decimal,
    pub positions: Vec<Position>,
}

impl Exchange {
    /// Exchange over an empty in-memory ledger
    pub fn in_memory(batch_capacity: usize) -> Self {
        let writer = Arc::new(LedgerWriter::new(Box::new(MemoryLedger::new()), batch_capacity));
        Self::assemble(writer)
    }

    /// Exchange over an existing store, warming the cache from its tables
    pub fn with_store(
        store: Box<dyn LedgerStore>,
        batch_capacity: usize,
    ) -> Result<(Self, WarmupReport), OrderError> {
        let writer = Arc::new(LedgerWriter::new(store, batch_capacity));
        let exchange = Self::assemble(writer);
        let report = exchange
            .writer
            .with_tables(|tables| exchange.cache.warm_from(tables))?;
        Ok((exchange, report))
    }

    fn assemble(writer: Arc<LedgerWriter>) -> Self {
        let cache = Arc::new(FastCache::new(writer.clone()));
        Self {
            engine: MatchingEngine::new(cache.clone()),
            lifecycle: OrderLifecycle::new(cache.clone()),
            cache,
            writer,
        }
    }

    pub fn create_account(&self, id: &str, balance: Decimal) -> Result<AccountId, ExchangeError> {
        let id = AccountId::try_new(id).ok_or(AccountError::InvalidId)?;
        self.cache.create_account(id.clone(), balance)?;
        info!(account_id = %id, balance = %balance, "Account created");
        Ok(id)
    }

    /// Create a symbol (a no-op if it exists) and credit shares to existing
    /// accounts. Every credit is validated before any is applied.
    pub fn create_symbol(&self, name: &str, credits: &[SymbolCredit]) -> Result<Symbol, ExchangeError> {
        let symbol = Symbol::try_new(name).ok_or(SymbolError::InvalidName)?;

        let mut validated = Vec::with_capacity(credits.len());
        for credit in credits {
            let account_id = AccountId::try_new(credit.account_id.as_str()).ok_or_else(|| {
                SymbolError::InvalidCredit {
                    account_id: credit.account_id.clone(),
                    shares: credit.shares,
                }
            })?;
            if credit.shares.is_sign_negative() && !credit.shares.is_zero() {
                return Err(SymbolError::InvalidCredit {
                    account_id: credit.account_id.clone(),
                    shares: credit.shares,
                }
                .into());
            }
            if !self.cache.hydrate_account(&account_id) {
                return Err(AccountError::NotFound { account_id }.into());
            }
            let key = PositionKey::new(account_id, symbol.clone());
            self.cache.check_position_credit(&key, credit.shares)?;
            validated.push((key, credit.shares));
        }

        self.cache.ensure_symbol(&symbol);
        for (key, shares) in validated {
            self.cache.adjust_position(&key, shares)?;
        }
        info!(symbol = %symbol, credits = credits.len(), "Symbol credited");
        Ok(symbol)
    }

    pub fn open_order(
        &self,
        account_id: &str,
        symbol: &str,
        amount: Decimal,
        limit: Decimal,
    ) -> Result<SubmitResult, ExchangeError> {
        let limit = Price::try_new(limit).map_err(|_| OrderError::InvalidPrice(limit.to_string()))?;
        let account_id = AccountId::try_new(account_id).ok_or(AccountError::InvalidId)?;
        let symbol = Symbol::try_new(symbol).ok_or(SymbolError::InvalidName)?;
        self.engine.submit_order(&account_id, &symbol, amount, limit)
    }

    pub fn cancel_order(&self, order_id: OrderId) -> Result<OrderStatusReport, ExchangeError> {
        self.lifecycle.cancel_order(order_id)
    }

    pub fn query_order(&self, order_id: OrderId) -> Result<OrderStatusReport, ExchangeError> {
        self.lifecycle.query_order(order_id)
    }

    /// Account that placed `order_id`, while the cache knows the order
    pub fn order_owner(&self, order_id: OrderId) -> Option<AccountId> {
        self.cache.order(order_id).map(|order| order.account_id)
    }

    /// Flush pending ledger commands, then read back every table
    pub fn dump(&self, row_limit: usize) -> LedgerDump {
        self.writer.dump(row_limit)
    }

    pub fn flush(&self) -> FlushReport {
        self.writer.flush()
    }

    pub fn ledger_stats(&self) -> WriterStats {
        self.writer.stats()
    }

    pub fn account(&self, id: &AccountId) -> Option<AccountView> {
        let balance = self.cache.balance(id)?;
        Some(AccountView {
            id: id.clone(),
            balance,
            positions: self.cache.positions_of(id),
        })
    }

    pub fn book_snapshot(&self, symbol: &Symbol, depth: usize) -> Option<BookSnapshot> {
        self.engine.book_snapshot(symbol, depth)
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }
}
