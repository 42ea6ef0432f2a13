//! Logging and tracing setup.
//!
//! Installs a `tracing` subscriber driven by [`LoggingConfig`]:
//!
//! - `RUST_LOG` overrides `level` when set
//! - `format: json` for machine-readable lines, `pretty` for terminals
//! - `otel.enabled` adds an OTLP/gRPC span exporter
//!
//! # Usage
//!
//! ```rust,ignore
//! use wukong_engine::telemetry::init_telemetry;
//!
//! let _guard = init_telemetry(&config.observability.logging);
//! ```

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Shuts down the tracer provider on drop, flushing pending spans.
#[derive(Debug)]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are exported over OTLP.
    #[must_use]
    pub const fn exports_traces(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e:?}");
            }
        }
    }
}

/// Filter from `RUST_LOG`, else the configured level, else `info`.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn build_fmt_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    if config.format == "pretty" {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .boxed()
    }
}

fn build_provider(config: &LoggingConfig) -> Option<SdkTracerProvider> {
    if !config.otel.enabled {
        return None;
    }
    match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otel.endpoint)
        .build()
    {
        Ok(exporter) => Some(
            SdkTracerProvider::builder()
                .with_simple_exporter(exporter)
                .build(),
        ),
        Err(e) => {
            eprintln!("Failed to create OTLP exporter: {e:?}, falling back to console logging");
            None
        }
    }
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place. Must run inside a Tokio runtime when OTLP export is enabled.
#[must_use]
pub fn init_telemetry(config: &LoggingConfig) -> TelemetryGuard {
    let provider = build_provider(config);
    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(config.otel.service_name.clone()))
    });

    let installed = Registry::default()
        .with(build_fmt_layer(config))
        .with(otel_layer)
        .with(build_filter(&config.level))
        .try_init();

    if installed.is_ok() {
        tracing::info!(
            level = %config.level,
            format = %config.format,
            otel = provider.is_some(),
            "Telemetry initialized"
        );
    }

    TelemetryGuard { provider }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_falls_back_to_info() {
        // RUST_LOG may be set in CI; only check that building never panics.
        let _ = build_filter("not a [valid filter");
        let _ = build_filter("debug,wukong_engine=trace");
    }

    #[test]
    fn disabled_otel_has_no_provider() {
        let config = LoggingConfig::default();
        assert!(build_provider(&config).is_none());
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = LoggingConfig {
            format: "pretty".to_string(),
            ..LoggingConfig::default()
        };
        let first = init_telemetry(&config);
        let second = init_telemetry(&config);
        assert!(!first.exports_traces());
        assert!(!second.exports_traces());
    }
}
