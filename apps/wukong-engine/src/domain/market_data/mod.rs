//! Market Data Bounded Context
//!
//! Bars and the timeframes that govern when they close.

mod bar;
mod timeframe;

pub use bar::{Bar, Ohlc};
pub use timeframe::TimeFrame;
