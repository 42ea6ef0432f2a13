//! Venue-backed execution for Sandbox and Real sessions.
//!
//! - [`LiveBackend`]: ack timers, placement retries, event forwarding
//! - [`PaperVenue`]: in-process venue used by Sandbox sessions
//! - [`retry`]: exponential backoff for transient venue errors

mod live_backend;
mod paper;
pub mod retry;

pub use live_backend::{LiveBackend, LiveBackendSettings};
pub use paper::PaperVenue;
pub use retry::{ExponentialBackoffCalculator, RetryError, VenueRetryPolicy, retry_with_backoff};
