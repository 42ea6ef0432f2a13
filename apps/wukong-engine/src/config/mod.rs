//! Configuration for the WuKong engine.
//!
//! YAML file with `${VAR}` / `${VAR:-default}` environment interpolation.
//! Every section has defaults; only `session.instruments` must be given.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wukong_engine::config::load_config;
//!
//! let config = load_config(Some("config.yaml"))?;
//! println!("mode: {}", config.session.mode);
//! ```

mod account;
mod audit;
mod backtest;
mod observability;
mod session;
mod venue;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use account::AccountConfig;
pub use audit::AuditConfig;
pub use backtest::BacktestConfig;
pub use observability::{LoggingConfig, MetricsConfig, ObservabilityConfig, OtelConfig};
pub use session::SessionConfig;
pub use venue::{RetryConfig, VenueConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Mode, timeframe and instruments.
    #[serde(default)]
    pub session: SessionConfig,
    /// Starting cash and leverage limits.
    #[serde(default)]
    pub account: AccountConfig,
    /// Simulated matching.
    #[serde(default)]
    pub backtest: BacktestConfig,
    /// Venue acknowledgment and retry settings.
    #[serde(default)]
    pub venue: VenueConfig,
    /// Logging, tracing and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Audit trail.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// `path` defaults to `config.yaml`.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Read a required environment variable.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvVar`] if it is unset or empty.
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

/// Replace `${VAR}` and `${VAR:-default}` with environment values.
#[allow(clippy::expect_used)] // Constant pattern
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map_or("", |m| m.as_str());
        match caps.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(value)) if !value.is_empty() => value,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Check cross-field rules serde cannot express.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first bad field.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.session.instruments.iter().all(|s| s.trim().is_empty()) {
        return invalid("session.instruments must list at least one instrument");
    }

    if let (Some(start), Some(end)) = config.session.window()? {
        if start >= end {
            return invalid("session.start must be before session.end");
        }
    }

    if let Some(share) = config.backtest.max_volume_participation {
        if share <= rust_decimal::Decimal::ZERO || share > rust_decimal::Decimal::ONE {
            return invalid("backtest.max_volume_participation must be in (0, 1]");
        }
    }
    if config.backtest.commission_bps.is_sign_negative() {
        return invalid("backtest.commission_bps cannot be negative");
    }

    if config.account.initial_cash.is_sign_negative() {
        return invalid("account.initial_cash cannot be negative");
    }
    if config.account.max_leverage < rust_decimal::Decimal::ONE {
        return invalid("account.max_leverage must be at least 1");
    }
    if config.account.check_margin && config.account.initial_cash.is_zero() {
        return invalid("account.check_margin needs a positive account.initial_cash");
    }

    if config.venue.ack_timeout_ms == 0 {
        return invalid("venue.ack_timeout_ms must be positive");
    }
    let retry = &config.venue.retry;
    if retry.max_attempts == 0 {
        return invalid("venue.retry.max_attempts must be at least 1");
    }
    if retry.backoff_multiplier < 1.0 {
        return invalid("venue.retry.backoff_multiplier must be at least 1.0");
    }
    if !(0.0..=1.0).contains(&retry.jitter_factor) {
        return invalid("venue.retry.jitter_factor must be between 0.0 and 1.0");
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return invalid("venue.retry.initial_backoff_ms cannot exceed max_backoff_ms");
    }

    let format = config.observability.logging.format.as_str();
    if !matches!(format, "json" | "pretty") {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be json or pretty, got '{format}'"
        )));
    }

    Ok(())
}
