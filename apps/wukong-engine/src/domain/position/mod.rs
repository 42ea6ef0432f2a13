//! Position Bounded Context
//!
//! Net positions built only from fills.

mod errors;
mod ledger;
mod position;

pub use errors::LedgerError;
pub use ledger::PositionLedger;
pub use position::Position;
