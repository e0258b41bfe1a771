//! Types library for the equity exchange
//!
//! This library provides the data model shared by the matching engine, the
//! ledger and the gateway: identifiers, decimal price/quantity wrappers, the
//! order lifecycle, durable ledger rows and the command/result shapes the
//! dispatcher speaks.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, AccountId, Symbol)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order lifecycle types
//! - `trade`: Execution records
//! - `account`: Account balances
//! - `position`: Share positions
//! - `records`: Durable ledger rows and dumps
//! - `command`: Inbound commands and outbound results
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
pub mod account;
pub mod position;
pub mod records;
pub mod command;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
    pub use crate::account::*;
    pub use crate::position::*;
    pub use crate::records::*;
    pub use crate::command::*;
    pub use crate::errors::*;
}
