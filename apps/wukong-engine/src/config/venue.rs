//! Venue connectivity configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::venue::{LiveBackendSettings, VenueRetryPolicy};

/// Settings for Sandbox and Real sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Acknowledgment deadline in milliseconds.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    /// Placement retries.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: default_ack_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl VenueConfig {
    /// Backend settings these values describe.
    #[must_use]
    pub fn backend_settings(&self) -> LiveBackendSettings {
        LiveBackendSettings {
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
            retry: self.retry.policy(),
        }
    }
}

/// Retry with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Delay cap in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Growth per retry.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Randomization factor.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryConfig {
    /// Policy these values describe.
    #[must_use]
    pub const fn policy(&self) -> VenueRetryPolicy {
        VenueRetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
            self.backoff_multiplier,
            self.jitter_factor,
        )
    }
}

const fn default_ack_timeout_ms() -> u64 {
    10_000
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}
