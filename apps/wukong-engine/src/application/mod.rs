//! Application Layer
//!
//! Orchestrates the domain through ports:
//!
//! - **Ports**: backends, venues, clocks and the audit trail
//! - **Services**: the order manager, sole writer of orders and positions
//! - **Scheduler**: the session loop and the strategy-facing API

pub mod ports;
pub mod scheduler;
pub mod services;

pub use ports::*;
pub use scheduler::*;
pub use services::*;
