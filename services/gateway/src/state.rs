use matching_engine::Exchange;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub exchange: Arc<Exchange>,
    /// Rows per table when a dump names no limit
    pub dump_rows: usize,
}

impl AppState {
    pub fn new(exchange: Arc<Exchange>, dump_rows: usize) -> Self {
        Self {
            exchange,
            dump_rows,
        }
    }
}
