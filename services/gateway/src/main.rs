use anyhow::Context;
use gateway::config::{Config, StoreKind};
use gateway::router::create_router;
use gateway::server::{self, ServerSettings};
use gateway::state::AppState;
use ledger::{JournalConfig, JournalLedger};
use matching_engine::Exchange;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::load();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(store = ?config.store, "Starting exchange gateway");

    let exchange = Arc::new(build_exchange(&config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let admin = TcpListener::bind(config.admin_addr)
        .await
        .with_context(|| format!("binding admin address {}", config.admin_addr))?;
    let app = create_router(AppState::new(exchange.clone(), config.dump_rows));
    let mut admin_shutdown = shutdown_rx.clone();
    tracing::info!("Admin HTTP listening on {}", config.admin_addr);
    let admin_task = tokio::spawn(async move {
        axum::serve(admin, app)
            .with_graceful_shutdown(async move {
                let _ = admin_shutdown.changed().await;
            })
            .await
    });

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding order protocol address {}", config.listen_addr))?;
    let settings = ServerSettings {
        max_frame_bytes: config.max_frame_bytes,
        dump_rows: config.dump_rows,
    };
    let order_task = tokio::spawn(server::serve(listener, exchange.clone(), settings, shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("Shutdown requested");
    let _ = shutdown_tx.send(true);

    order_task.await??;
    admin_task.await??;

    let (flushed, stats) = tokio::task::spawn_blocking(move || {
        let flushed = exchange.flush();
        (flushed, exchange.ledger_stats())
    })
    .await?;
    tracing::info!(
        applied = flushed.applied,
        failed = flushed.failed,
        total_applied = stats.applied,
        total_failed = stats.failed,
        "Final ledger flush complete"
    );

    Ok(())
}

fn build_exchange(config: &Config) -> anyhow::Result<Exchange> {
    match config.store {
        StoreKind::Memory => Ok(Exchange::in_memory(config.batch_capacity)),
        StoreKind::Journal => {
            let mut journal = JournalConfig::new(&config.journal_dir);
            journal.max_file_size = config.journal_max_file_size;
            let store = JournalLedger::open(journal)
                .with_context(|| format!("opening journal at {}", config.journal_dir.display()))?;
            tracing::info!(
                replayed = store.replayed(),
                corrupt_records = store.corruption().len(),
                "Journal replayed"
            );
            let (exchange, report) = Exchange::with_store(Box::new(store), config.batch_capacity)
                .context("warming cache from journal")?;
            tracing::info!(
                accounts = report.accounts,
                symbols = report.symbols,
                positions = report.positions,
                open_orders = report.open_orders,
                "Cache warmed"
            );
            Ok(exchange)
        }
    }
}
