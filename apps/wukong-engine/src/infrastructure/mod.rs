//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - `backtest/`: simulated matching against historical bars
//! - `venue/`: venue-backed backend, paper venue, retry policy
//! - `clock/`: historical and live bar clocks, bar file loading
//! - `persistence/`: audit sinks (in-memory, JSON Lines)
//! - `container`: wires a session from configuration

pub mod backtest;
pub mod clock;
pub mod container;
pub mod persistence;
pub mod venue;

pub use container::{ContainerError, SessionContainer, open_audit};
