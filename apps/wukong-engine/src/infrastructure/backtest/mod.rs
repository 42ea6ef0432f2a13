//! Backtest execution: simulated matching against historical bars.

mod backend;
mod fill_engine;

pub use backend::BacktestBackend;
pub use fill_engine::{FillModel, FillResult, RestingBook, RestingOrder};
