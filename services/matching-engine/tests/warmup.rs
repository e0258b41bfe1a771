//! Restart over a journal-backed ledger
//!
//! State written by one exchange is replayed from the journal and warmed
//! into a fresh cache; matching then continues against restored orders.

use ledger::{JournalConfig, JournalLedger};
use matching_engine::Exchange;
use rust_decimal::Decimal;
use tempfile::TempDir;
use types::command::SymbolCredit;
use types::ids::AccountId;
use types::order::ReportState;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn open_exchange(dir: &TempDir) -> Exchange {
    let store = JournalLedger::open(JournalConfig::new(dir.path())).unwrap();
    let (exchange, _) = Exchange::with_store(Box::new(store), 4).unwrap();
    exchange
}

#[test]
fn test_matching_continues_after_restart() {
    let dir = TempDir::new().unwrap();

    let (sell, partial_buy) = {
        let exchange = open_exchange(&dir);
        exchange.create_account("A1", dec("1000")).unwrap();
        exchange.create_account("A2", dec("0")).unwrap();
        exchange
            .create_symbol(
                "SPY",
                &[SymbolCredit {
                    account_id: "A2".into(),
                    shares: dec("10"),
                }],
            )
            .unwrap();
        let sell = exchange.open_order("A2", "SPY", dec("-10"), dec("5")).unwrap();
        let buy = exchange.open_order("A1", "SPY", dec("4"), dec("5")).unwrap();
        exchange.flush();
        (sell.order_id, buy.order_id)
    };

    let store = JournalLedger::open(JournalConfig::new(dir.path())).unwrap();
    assert!(store.corruption().is_empty());
    let (exchange, report) = Exchange::with_store(Box::new(store), 4).unwrap();
    assert_eq!(report.accounts, 2);
    assert_eq!(report.open_orders, 1);

    let restored = exchange.query_order(sell).unwrap();
    assert_eq!(restored.fills.len(), 1);
    assert_eq!(restored.fills[0].shares, dec("-4"));
    assert_eq!(restored.state, ReportState::Open { shares: dec("-6") });
    // Fully filled before the restart, so not live any more
    assert!(exchange.query_order(partial_buy).unwrap_err().is_not_found());

    let next = exchange.open_order("A1", "SPY", dec("6"), dec("5")).unwrap();
    assert!(next.order_id > partial_buy);
    assert_eq!(next.executions.len(), 1);
    assert_eq!(next.executions[0].sell_order, sell);

    assert_eq!(exchange.account(&AccountId::new("A1")).unwrap().balance, dec("950"));
    assert_eq!(exchange.account(&AccountId::new("A2")).unwrap().balance, dec("50"));
    assert_eq!(exchange.query_order(sell).unwrap().state, ReportState::Filled);

    let dump = exchange.dump(100);
    assert_eq!(dump.transactions.len(), 2);
    assert!(dump.sell_orders.is_empty());
    assert_eq!(exchange.ledger_stats().failed, 0);
}

#[test]
fn test_duplicate_account_after_restart() {
    let dir = TempDir::new().unwrap();
    {
        let exchange = open_exchange(&dir);
        exchange.create_account("A1", dec("1")).unwrap();
        exchange.flush();
    }

    let exchange = open_exchange(&dir);
    assert!(exchange.create_account("A1", dec("2")).is_err());
    assert_eq!(exchange.account(&AccountId::new("A1")).unwrap().balance, dec("1"));
}

#[test]
fn test_cancelled_order_id_not_reused_after_restart() {
    let dir = TempDir::new().unwrap();
    let cancelled = {
        let exchange = open_exchange(&dir);
        exchange.create_account("A1", dec("100")).unwrap();
        let buy = exchange.open_order("A1", "SPY", dec("1"), dec("5")).unwrap();
        exchange.cancel_order(buy.order_id).unwrap();
        // Rejected for funds, but the id is spent all the same
        assert!(exchange.open_order("A1", "SPY", dec("1000"), dec("5")).is_err());
        exchange.flush();
        buy.order_id
    };

    let exchange = open_exchange(&dir);
    let next = exchange.open_order("A1", "SPY", dec("1"), dec("5")).unwrap();
    assert_eq!(next.order_id.value(), cancelled.value() + 2);
    assert!(exchange.query_order(cancelled).unwrap_err().is_not_found());
}
