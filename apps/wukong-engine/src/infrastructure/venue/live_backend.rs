//! Execution backend for Sandbox and Real sessions.
//!
//! Wraps a [`VenuePort`]. Placement runs on its own task with retry and
//! backoff, guarded by a per-order acknowledgment timer. Venue events are
//! forwarded into the engine's report channel by a pump task, which also
//! disarms timers once an order is acknowledged or rejected.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::retry::{RetryError, VenueRetryPolicy, retry_with_backoff};
use crate::application::ports::{
    BackendError, BackendOrderState, ExecutionBackend, ExecutionReport, ReportReceiver,
    ReportSender, SubmitRequest, VenueError, VenuePort,
};
use crate::domain::market_data::Bar;
use crate::domain::order_execution::{CancelReason, RejectReason};
use crate::domain::session::Mode;
use crate::domain::shared::{OrderId, Timestamp};

type AckTimers = Arc<Mutex<HashMap<OrderId, JoinHandle<()>>>>;

/// Settings for a venue-backed session.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveBackendSettings {
    /// How long a placement may wait for an acknowledgment.
    pub ack_timeout: Duration,
    /// Placement retry policy.
    pub retry: VenueRetryPolicy,
}

impl Default for LiveBackendSettings {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(10),
            retry: VenueRetryPolicy::default(),
        }
    }
}

/// Venue-backed backend. Must be created inside a Tokio runtime.
pub struct LiveBackend<V: VenuePort + 'static> {
    mode: Mode,
    venue: Arc<V>,
    reports: ReportSender,
    settings: LiveBackendSettings,
    timers: AckTimers,
    pump: JoinHandle<()>,
}

impl<V: VenuePort + 'static> LiveBackend<V> {
    /// Wire `venue` into the engine.
    ///
    /// `venue_events` is the channel the venue reports on; `reports` is the
    /// session's report queue.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] for a mode that does not route to a venue.
    pub fn new(
        mode: Mode,
        venue: Arc<V>,
        venue_events: ReportReceiver,
        reports: ReportSender,
        settings: LiveBackendSettings,
    ) -> Result<Self, BackendError> {
        if !mode.routes_to_venue() {
            return Err(BackendError::Unavailable(format!(
                "{mode} sessions do not route to a venue"
            )));
        }

        let timers: AckTimers = Arc::new(Mutex::new(HashMap::new()));
        let pump = tokio::spawn(forward_venue_events(
            venue_events,
            reports.clone(),
            Arc::clone(&timers),
        ));

        info!(venue = venue.name(), %mode, "Live backend started");

        Ok(Self {
            mode,
            venue,
            reports,
            settings,
            timers,
            pump,
        })
    }

    /// The wrapped venue.
    #[must_use]
    pub fn venue(&self) -> &Arc<V> {
        &self.venue
    }

    /// Orders still waiting for an acknowledgment.
    #[must_use]
    pub fn awaiting_ack(&self) -> usize {
        self.timers.lock().len()
    }

    fn arm_ack_timer(&self, order_id: OrderId) {
        let deadline = self.settings.ack_timeout;
        let reports = self.reports.clone();
        let timers = Arc::clone(&self.timers);
        let key = order_id.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            timers.lock().remove(&order_id);
            warn!(%order_id, deadline_ms = deadline.as_millis() as u64, "Acknowledgment deadline passed");
            let _ = reports.send(ExecutionReport::AckTimeout {
                order_id,
                deadline_ms: deadline.as_millis() as u64,
                at: Timestamp::now(),
            });
        });

        if let Some(previous) = self.timers.lock().insert(key, handle) {
            previous.abort();
        }
    }
}

fn disarm(timers: &AckTimers, order_id: &OrderId) {
    if let Some(handle) = timers.lock().remove(order_id) {
        handle.abort();
    }
}

async fn forward_venue_events(
    mut venue_events: ReportReceiver,
    reports: ReportSender,
    timers: AckTimers,
) {
    while let Some(report) = venue_events.recv().await {
        if report.resolves_ack() {
            disarm(&timers, report.order_id());
        }
        debug!(order_id = %report.order_id(), kind = report.kind(), "Venue event");
        if reports.send(report).is_err() {
            break;
        }
    }
    debug!("Venue event stream closed");
}

fn map_venue_error(err: VenueError) -> BackendError {
    match err {
        VenueError::AlreadyTerminal { order_id } => BackendError::AlreadyTerminal { order_id },
        VenueError::NotFound { order_id } => BackendError::UnknownOrder { order_id },
        other => BackendError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl<V: VenuePort + 'static> ExecutionBackend for LiveBackend<V> {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn name(&self) -> &str {
        self.venue.name()
    }

    async fn submit(&self, request: SubmitRequest) -> Result<(), BackendError> {
        request.validate()?;
        self.arm_ack_timer(request.order_id.clone());

        let venue = Arc::clone(&self.venue);
        let reports = self.reports.clone();
        let timers = Arc::clone(&self.timers);
        let policy = self.settings.retry.clone();

        tokio::spawn(async move {
            let placed = {
                let venue = venue.as_ref();
                let request = &request;
                retry_with_backoff(&policy, |_| venue.place_order(request)).await
            };

            let reason = match placed {
                Ok(()) => {
                    debug!(order_id = %request.order_id, "Order handed to venue");
                    return;
                }
                Err(RetryError::Permanent(err)) => RejectReason::venue(err.to_string()),
                Err(RetryError::Exhausted { attempts, last }) => {
                    RejectReason::retries_exhausted(attempts, last)
                }
            };

            disarm(&timers, &request.order_id);
            warn!(order_id = %request.order_id, reason = %reason, "Placement failed");
            let _ = reports.send(ExecutionReport::Rejected {
                order_id: request.order_id,
                reason,
                at: Timestamp::now(),
            });
        });

        Ok(())
    }

    async fn cancel(&self, order_id: &OrderId, reason: CancelReason) -> Result<(), BackendError> {
        self.venue
            .cancel_order(order_id, &reason)
            .await
            .map_err(map_venue_error)
    }

    async fn query(&self, order_id: &OrderId) -> Result<Option<BackendOrderState>, BackendError> {
        self.venue
            .query_order(order_id)
            .await
            .map_err(map_venue_error)
    }

    async fn on_bar(&self, bar: &Bar) -> Result<(), BackendError> {
        self.venue
            .on_market_data(bar)
            .await
            .map_err(map_venue_error)
    }
}

impl<V: VenuePort + 'static> Drop for LiveBackend<V> {
    fn drop(&mut self) {
        self.pump.abort();
        for (_, handle) in self.timers.lock().drain() {
            handle.abort();
        }
    }
}

impl<V: VenuePort + 'static> std::fmt::Debug for LiveBackend<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveBackend")
            .field("mode", &self.mode)
            .field("venue", &self.venue.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
