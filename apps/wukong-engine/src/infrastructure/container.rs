//! Session Container
//!
//! Wires a [`TradingSession`] from configuration: report channel, the
//! backend for the configured mode, the matching clock and the audit sink.
//! The backend is chosen here once and never switched afterwards.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AuditError, AuditPort, BackendError, BarClock, ClockError, ExecutionBackend, NoOpAudit,
    ReportReceiver, VenuePort, report_channel,
};
use crate::application::scheduler::{Strategy, TradingSession};
use crate::config::{AuditConfig, Config, ConfigError};
use crate::domain::market_data::Bar;
use crate::domain::session::Mode;
use crate::error::EngineError;
use crate::infrastructure::backtest::BacktestBackend;
use crate::infrastructure::clock::{HistoricalClock, LiveClock};
use crate::infrastructure::persistence::JsonlAuditSink;
use crate::infrastructure::venue::{LiveBackend, PaperVenue};

/// Failure while assembling a session.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Configuration is unusable for the requested session.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bar series failed validation.
    #[error("Invalid bar series: {0}")]
    Clock(#[from] ClockError),

    /// Backend could not be created.
    #[error("Backend setup failed: {0}")]
    Backend(#[from] BackendError),

    /// Session rejected its parts.
    #[error("Session setup failed: {0}")]
    Engine(#[from] EngineError),

    /// Audit sink could not be opened.
    #[error("Audit setup failed: {0}")]
    Audit(#[from] AuditError),

    /// Requested builder does not serve the configured mode.
    #[error("{builder} cannot build a {mode} session")]
    WrongMode {
        /// Builder that was called.
        builder: &'static str,
        /// Configured mode.
        mode: Mode,
    },
}

/// Builds sessions from a loaded [`Config`].
pub struct SessionContainer {
    config: Config,
    audit: Arc<dyn AuditPort>,
    cancel: CancellationToken,
}

impl SessionContainer {
    /// Container with no audit trail and a fresh cancellation token.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            audit: Arc::new(NoOpAudit),
            cancel: CancellationToken::new(),
        }
    }

    /// Send audit records to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditPort>) -> Self {
        self.audit = audit;
        self
    }

    /// Open the audit sink named in the config, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Audit`] if the file cannot be opened.
    pub async fn with_configured_audit(self) -> Result<Self, ContainerError> {
        let audit = open_audit(&self.config.audit).await?;
        Ok(self.with_audit(audit))
    }

    /// Stop built sessions when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Cancellation token shared with built sessions and live clocks.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Backtest over a pre-loaded bar series.
    ///
    /// # Errors
    ///
    /// Fails if the configured mode is not Backtest or the bars do not
    /// satisfy the clock's sequencing rules.
    pub fn backtest(
        &self,
        bars: Vec<Bar>,
        strategy: Box<dyn Strategy>,
    ) -> Result<TradingSession, ContainerError> {
        let session = &self.config.session;
        self.expect_mode("backtest", |mode| mode == Mode::Backtest)?;

        let (start, end) = session.window()?;
        let clock = HistoricalClock::new(session.timeframe, bars)?.with_window(start, end)?;
        let (reports_tx, reports_rx) = report_channel();
        let backend = BacktestBackend::new(reports_tx, self.config.backtest.fill_model());

        self.assemble(Box::new(backend), Box::new(clock), reports_rx, strategy)
    }

    /// Sandbox session against the in-process paper venue.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the configured mode is not Sandbox.
    pub fn sandbox(
        &self,
        feed: mpsc::Receiver<Bar>,
        strategy: Box<dyn Strategy>,
    ) -> Result<TradingSession, ContainerError> {
        self.expect_mode("sandbox", |mode| mode == Mode::Sandbox)?;
        let (venue, venue_events) = PaperVenue::new(self.config.backtest.fill_model());
        self.venue_session(Arc::new(venue), venue_events, feed, strategy)
    }

    /// Sandbox or Real session against a caller-supplied venue adapter.
    ///
    /// `venue_events` is the channel the adapter reports on. Must be called
    /// inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the configured mode does not route to a venue.
    pub fn venue_session<V: VenuePort + 'static>(
        &self,
        venue: Arc<V>,
        venue_events: ReportReceiver,
        feed: mpsc::Receiver<Bar>,
        strategy: Box<dyn Strategy>,
    ) -> Result<TradingSession, ContainerError> {
        let mode = self.config.session.mode;
        self.expect_mode("venue", |mode| mode.routes_to_venue())?;

        let (reports_tx, reports_rx) = report_channel();
        let backend = LiveBackend::new(
            mode,
            venue,
            venue_events,
            reports_tx,
            self.config.venue.backend_settings(),
        )?;
        let clock = LiveClock::new(self.config.session.timeframe, feed, self.cancel.clone());

        self.assemble(Box::new(backend), Box::new(clock), reports_rx, strategy)
    }

    fn expect_mode(
        &self,
        builder: &'static str,
        accepts: impl Fn(Mode) -> bool,
    ) -> Result<(), ContainerError> {
        let mode = self.config.session.mode;
        if accepts(mode) {
            Ok(())
        } else {
            Err(ContainerError::WrongMode { builder, mode })
        }
    }

    fn assemble(
        &self,
        backend: Box<dyn ExecutionBackend>,
        clock: Box<dyn BarClock>,
        reports: ReportReceiver,
        strategy: Box<dyn Strategy>,
    ) -> Result<TradingSession, ContainerError> {
        let mut settings = self.config.session.settings();
        settings.account = self.config.account.settings();
        let session = TradingSession::new(
            settings,
            backend,
            clock,
            reports,
            strategy,
        )?
        .with_audit(Arc::clone(&self.audit))
        .with_cancellation(self.cancel.clone());

        tracing::info!(
            session_id = %session.id(),
            mode = %self.config.session.mode,
            timeframe = %self.config.session.timeframe,
            instruments = ?self.config.session.instruments,
            "Session assembled"
        );
        Ok(session)
    }
}

impl std::fmt::Debug for SessionContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContainer")
            .field("mode", &self.config.session.mode)
            .field("timeframe", &self.config.session.timeframe)
            .finish_non_exhaustive()
    }
}

/// Audit sink described by `config`: JSON Lines when a path is set, otherwise none.
///
/// # Errors
///
/// Returns [`AuditError::Io`] if the file cannot be opened.
pub async fn open_audit(config: &AuditConfig) -> Result<Arc<dyn AuditPort>, AuditError> {
    match config.jsonl_path.as_deref() {
        Some(path) => Ok(Arc::new(JsonlAuditSink::open(path).await?)),
        None => Ok(Arc::new(NoOpAudit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduler::StrategyContext;
    use crate::config::load_config_from_string;

    struct Idle;

    impl Strategy for Idle {
        fn on_bar(&mut self, _ctx: &mut StrategyContext<'_>, _bar: &Bar) {}
    }

    fn container(mode: &str) -> SessionContainer {
        let yaml = format!("session:\n  mode: {mode}\n  timeframe: 1m\n  instruments: [BTC]\n");
        SessionContainer::new(load_config_from_string(&yaml).unwrap())
    }

    #[tokio::test]
    async fn backtest_builder_runs_empty_series() {
        let session = container("BACKTEST")
            .backtest(Vec::new(), Box::new(Idle))
            .unwrap();

        let report = session.run().await.unwrap();

        assert_eq!(report.bars_processed, 0);
        assert!(report.orders.is_empty());
    }

    #[test]
    fn backtest_builder_refuses_live_mode() {
        let err = container("REAL")
            .backtest(Vec::new(), Box::new(Idle))
            .unwrap_err();

        assert!(matches!(err, ContainerError::WrongMode { mode: Mode::Real, .. }));
    }

    #[tokio::test]
    async fn sandbox_builder_refuses_backtest_mode() {
        let (_tx, rx) = mpsc::channel(1);

        let err = container("BACKTEST").sandbox(rx, Box::new(Idle)).unwrap_err();

        assert!(matches!(err, ContainerError::WrongMode { .. }));
    }

    #[tokio::test]
    async fn sandbox_session_ends_when_feed_closes() {
        let (tx, rx) = mpsc::channel(1);
        let session = container("SANDBOX").sandbox(rx, Box::new(Idle)).unwrap();
        drop(tx);

        let report = session.run().await.unwrap();

        assert_eq!(report.mode, Mode::Sandbox);
        assert_eq!(report.bars_processed, 0);
    }

    #[tokio::test]
    async fn no_path_means_no_audit_file() {
        assert!(open_audit(&AuditConfig::default()).await.is_ok());
    }
}
