// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! WuKong Engine - Rust Core Library
//!
//! One strategy, three execution modes. The same strategy code runs against
//! a deterministic backtest, a paper venue, or a real venue; only the backend
//! chosen at session start differs.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: orders and their state machine, fills, positions, bars,
//!   timeframes, execution mode
//!
//! - **Application**: ports and orchestration
//!   - `ports`: `ExecutionBackend`, `VenuePort`, `BarClock`, `AuditPort`
//!   - `services`: `OrderManager`, the only writer of order and position state
//!   - `scheduler`: `TradingSession` loop and the `Strategy` API
//!
//! - **Infrastructure**: adapters
//!   - `backtest`: simulated matching
//!   - `venue`: live backend with ack timers and retries, paper venue
//!   - `clock`: historical and live bar clocks
//!   - `persistence`: audit sinks
//!   - `container`: session wiring from configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Ports, order manager and session scheduler.
pub mod application;

/// Infrastructure layer - Backends, clocks and audit sinks.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Engine error taxonomy.
pub mod error;

/// Prometheus metrics.
pub mod observability;

/// Logging and tracing setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::account::{Account, AccountSettings};
pub use domain::market_data::{Bar, Ohlc, TimeFrame};
pub use domain::order_execution::{
    CancelReason, Fill, Order, OrderIntent, OrderStatus, OrderType, RejectReason, Side,
};
pub use domain::position::{Position, PositionLedger};
pub use domain::session::Mode;
pub use domain::shared::{FillId, OrderId, Price, Quantity, Symbol, Timestamp};

// Application re-exports
pub use application::ports::{
    BackendError, ExecutionBackend, ExecutionReport, VenueError, VenuePort,
};
pub use application::scheduler::{
    SessionReport, SessionSettings, Strategy, StrategyContext, TradingSession,
};
pub use application::services::OrderManager;

// Infrastructure re-exports
pub use infrastructure::backtest::{BacktestBackend, FillModel};
pub use infrastructure::clock::{HistoricalClock, LiveClock, read_bars};
pub use infrastructure::persistence::{InMemoryAuditLog, JsonlAuditSink};
pub use infrastructure::venue::{LiveBackend, LiveBackendSettings, PaperVenue, VenueRetryPolicy};
pub use infrastructure::{ContainerError, SessionContainer};

pub use config::{Config, ConfigError, load_config};
pub use error::{EngineError, ErrorCategory, ErrorCode};
