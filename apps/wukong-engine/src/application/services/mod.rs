//! Application Services
//!
//! Stateful coordinators that sit between the scheduler and the ports.

mod order_manager;

pub use order_manager::{CancelAction, FollowUp, OrderManager, ReportOutcome};
