//! Concurrency test
//!
//! Buyers and sellers submit crossing orders from separate threads against
//! one shared exchange. After every thread joins and every open order is
//! cancelled, cash and shares must be exactly where they started.

use matching_engine::Exchange;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use types::command::SymbolCredit;
use types::ids::{AccountId, OrderId, Symbol};
use types::order::ReportState;

const TRADERS: usize = 4;
const ORDERS_PER_THREAD: usize = 200;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> Arc<Exchange> {
    // Small batches force frequent flushes from the submitting threads
    let exchange = Arc::new(Exchange::in_memory(16));
    let mut credits = Vec::new();
    for i in 0..TRADERS {
        exchange.create_account(&format!("B{i}"), dec("100000")).unwrap();
        exchange.create_account(&format!("S{i}"), dec("0")).unwrap();
        credits.push(SymbolCredit {
            account_id: format!("S{i}"),
            shares: dec("1000"),
        });
    }
    exchange.create_symbol("SPY", &credits).unwrap();
    exchange
}

fn totals(exchange: &Exchange) -> (Decimal, Decimal) {
    let mut cash = Decimal::ZERO;
    let mut shares = Decimal::ZERO;
    for i in 0..TRADERS {
        for id in [format!("B{i}"), format!("S{i}")] {
            let view = exchange.account(&AccountId::new(id)).unwrap();
            cash += view.balance;
            shares += view.positions.iter().map(|p| p.amount).sum::<Decimal>();
        }
    }
    (cash, shares)
}

#[test]
fn test_concurrent_opposite_orders_conserve_cash_and_shares() {
    let exchange = setup();
    let (cash_before, shares_before) = totals(&exchange);

    let mut handles = Vec::new();
    for i in 0..TRADERS {
        for side in ["B", "S"] {
            let exchange = exchange.clone();
            handles.push(thread::spawn(move || {
                let account = format!("{side}{i}");
                let mut ids = Vec::new();
                for n in 0..ORDERS_PER_THREAD {
                    let limit = Decimal::from(9 + (n % 3) as i64);
                    let shares = Decimal::from(1 + (n % 4) as i64);
                    let amount = if side == "B" { shares } else { -shares };
                    let result = exchange.open_order(&account, "SPY", amount, limit).unwrap();
                    assert!(result.filled().as_decimal() <= shares);
                    ids.push(result.order_id);
                }
                ids
            }));
        }
    }

    let ids: Vec<OrderId> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(ids.len(), TRADERS * 2 * ORDERS_PER_THREAD);
    assert!(!exchange.engine().any_crossed());

    let mut fill_total = Decimal::ZERO;
    for id in &ids {
        let report = exchange.query_order(*id).unwrap();
        fill_total += report.fills.iter().map(|f| f.shares.abs()).sum::<Decimal>();
        if let ReportState::Open { .. } = report.state {
            exchange.cancel_order(*id).unwrap();
        }
    }

    let dump = exchange.dump(usize::MAX);
    let traded: Decimal = dump.transactions.iter().map(|t| t.amount).sum();
    // Every execution fills one buy and one sell
    assert_eq!(fill_total, traded * Decimal::from(2));
    assert!(dump.buy_orders.is_empty());
    assert!(dump.sell_orders.is_empty());
    assert_eq!(exchange.ledger_stats().failed, 0);

    let (cash_after, shares_after) = totals(&exchange);
    assert_eq!(cash_after, cash_before);
    assert_eq!(shares_after, shares_before);

    let book = exchange.book_snapshot(&Symbol::new("SPY"), 10).unwrap();
    assert!(book.bids.is_empty() && book.asks.is_empty());
}

#[test]
fn test_concurrent_account_creation_rejects_duplicates() {
    let exchange = Arc::new(Exchange::in_memory(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let exchange = exchange.clone();
            thread::spawn(move || exchange.create_account("shared", dec("1")).is_ok())
        })
        .collect();

    let created = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(created, 1);
    assert_eq!(exchange.dump(10).accounts.len(), 1);
}
