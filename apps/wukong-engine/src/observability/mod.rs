//! Observability: Prometheus metrics for order flow.
//!
//! Logging and tracing setup lives in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    MetricsError, init_metrics, record_bar, record_fill, record_inconsistency,
    record_order_rejection, record_order_submitted, record_order_terminal, update_open_orders,
};
