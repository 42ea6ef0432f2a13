//! Domain Layer
//!
//! Pure business logic with no I/O: orders, fills, positions, bars and the
//! rules that connect them.
//!
//! # Bounded Contexts
//!
//! - `account`: cash, margin and available cash
//! - `order_execution`: order lifecycle and the state machine
//! - `position`: net position ledger with reduce-only enforcement
//! - `market_data`: bars and timeframe boundaries
//! - `session`: execution mode
//! - `shared`: identifiers and value objects

pub mod account;
pub mod market_data;
pub mod order_execution;
pub mod position;
pub mod session;
pub mod shared;
