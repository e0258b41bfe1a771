//! Network surfaces of the exchange
//!
//! - `server`/`framing`/`protocol`: length-prefixed JSON order protocol over TCP
//! - `router`/`handlers`: read-only admin HTTP routes
//! - `config`: flags, environment and `.env`

pub mod config;
pub mod error;
pub mod framing;
pub mod handlers;
pub mod protocol;
pub mod router;
pub mod server;
pub mod state;
