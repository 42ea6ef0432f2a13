//! Strategy Scheduler
//!
//! Single-threaded, cooperative dispatch of bars and order updates to one
//! strategy instance.

mod report;
mod session;
mod strategy;

pub use report::SessionReport;
pub use session::{SessionSettings, TradingSession};
pub use strategy::{Strategy, StrategyContext};
