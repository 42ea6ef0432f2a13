//! Account Bounded Context
//!
//! Cash and margin derived from the position ledger and working orders.

mod account;

pub use account::{Account, AccountSettings};
