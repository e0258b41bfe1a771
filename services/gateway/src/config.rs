//! Process configuration
//!
//! Flags win over environment variables, which win over `.env`, which wins
//! over the defaults below.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Where the ledger tables live
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Tables in memory only; lost on exit
    Memory,
    /// Checksummed journal replayed on startup
    Journal,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "gateway", about = "Equity exchange matching engine")]
pub struct Config {
    /// Order protocol listen address
    #[arg(long, env = "EXCHANGE_LISTEN", default_value = "127.0.0.1:12345")]
    pub listen_addr: SocketAddr,

    /// Admin HTTP listen address
    #[arg(long, env = "EXCHANGE_ADMIN", default_value = "127.0.0.1:8080")]
    pub admin_addr: SocketAddr,

    /// Ledger commands queued before a synchronous flush
    #[arg(long, env = "EXCHANGE_BATCH_CAPACITY", default_value_t = ledger::DEFAULT_BATCH_CAPACITY)]
    pub batch_capacity: usize,

    #[arg(long, env = "EXCHANGE_STORE", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    #[arg(long, env = "EXCHANGE_JOURNAL_DIR", default_value = "./ledger")]
    pub journal_dir: PathBuf,

    /// Journal segment size before rotation, in bytes
    #[arg(long, env = "EXCHANGE_JOURNAL_MAX_FILE_SIZE", default_value_t = 64 * 1024 * 1024)]
    pub journal_max_file_size: u64,

    /// Largest accepted request frame, in bytes
    #[arg(long, env = "EXCHANGE_MAX_FRAME", default_value_t = 1024 * 1024)]
    pub max_frame_bytes: usize,

    /// Rows per table returned by a dump that names no limit
    #[arg(long, env = "EXCHANGE_DUMP_ROWS", default_value_t = 100)]
    pub dump_rows: usize,

    /// Used when RUST_LOG is unset
    #[arg(long, env = "EXCHANGE_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Config {
    pub fn load() -> Self {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["gateway"]).unwrap();
        assert_eq!(config.listen_addr.port(), 12345);
        assert_eq!(config.batch_capacity, 100);
        assert_eq!(config.store, StoreKind::Memory);
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "gateway",
            "--store",
            "journal",
            "--journal-dir",
            "/tmp/ledger",
            "--batch-capacity",
            "7",
        ])
        .unwrap();
        assert_eq!(config.store, StoreKind::Journal);
        assert_eq!(config.journal_dir, PathBuf::from("/tmp/ledger"));
        assert_eq!(config.batch_capacity, 7);
    }
}
