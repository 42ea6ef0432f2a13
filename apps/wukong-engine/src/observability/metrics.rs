//! Prometheus metrics for the execution core.
//!
//! Recording functions are cheap no-ops until a recorder is installed, so
//! the engine calls them unconditionally.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::MetricsConfig;
use crate::domain::order_execution::{OrderStatus, OrderType};
use crate::domain::session::Mode;
use crate::error::ErrorCode;

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Install the Prometheus exporter if enabled.
///
/// Starts an HTTP listener that serves `/metrics`.
///
/// # Errors
///
/// Returns an error for an unparsable address or if the listener cannot
/// be installed (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::debug!("Metrics exporter disabled");
        return Ok(());
    }

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .map_err(|e| MetricsError::Configuration(format!("{}: {e}", config.listen_addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %addr, "Prometheus metrics exporter started");
    Ok(())
}

// ============================================================================
// Order Lifecycle Metrics
// ============================================================================

/// Record an order handed to the backend.
pub fn record_order_submitted(mode: Mode, order_type: OrderType) {
    counter!(
        "wukong_orders_submitted_total",
        "mode" => mode.to_string(),
        "order_type" => order_type.label()
    )
    .increment(1);
}

/// Record an order reaching a terminal status.
pub fn record_order_terminal(mode: Mode, status: OrderStatus) {
    counter!(
        "wukong_orders_terminal_total",
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a rejection with its reason code.
pub fn record_order_rejection(mode: Mode, code: &str) {
    counter!(
        "wukong_order_rejections_total",
        "mode" => mode.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record an applied fill.
pub fn record_fill(mode: Mode, quantity: f64) {
    counter!("wukong_fills_total", "mode" => mode.to_string()).increment(1);
    histogram!("wukong_fill_quantity", "mode" => mode.to_string()).record(quantity);
}

/// Record a report the engine could not reconcile.
pub fn record_inconsistency(code: ErrorCode) {
    counter!(
        "wukong_inconsistencies_total",
        "code" => code.reason()
    )
    .increment(1);
}

/// Record a bar dispatched to the strategy.
pub fn record_bar(mode: Mode) {
    counter!("wukong_bars_total", "mode" => mode.to_string()).increment(1);
}

/// Update the open orders gauge.
pub fn update_open_orders(mode: Mode, count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("wukong_open_orders", "mode" => mode.to_string()).set(count as f64);
}
