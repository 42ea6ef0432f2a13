//! WuKong Engine Binary
//!
//! Runs a demo momentum strategy over a bar file.
//!
//! # Usage
//!
//! ```bash
//! WUKONG_BARS=bars.json cargo run --bin wukong-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `WUKONG_BARS`: JSON array of bars to replay (Backtest) or stream (Sandbox)
//!
//! ## Optional
//! - `WUKONG_CONFIG`: config file path (default: config.yaml)
//! - `RUST_LOG`: overrides the configured log level

use std::collections::HashMap;

use anyhow::{Context, bail};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wukong_engine::config::require_env;
use wukong_engine::observability::init_metrics;
use wukong_engine::telemetry::init_telemetry;
use wukong_engine::{
    Bar, Mode, Order, OrderIntent, Price, Quantity, SessionContainer, SessionReport, Side,
    Strategy, StrategyContext, Symbol, load_config, read_bars,
};

/// Buffer between the bar file reader and the live clock.
const FEED_CAPACITY: usize = 256;

/// Goes long one unit after an up-close, exits with a reduce-only order
/// after a down-close.
#[derive(Debug, Default)]
struct MomentumDemo {
    last_close: HashMap<Symbol, Price>,
}

impl Strategy for MomentumDemo {
    fn on_start(&mut self, ctx: &mut StrategyContext<'_>) {
        tracing::info!(mode = %ctx.mode(), instruments = ctx.instruments().len(), "Strategy started");
    }

    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>, bar: &Bar) {
        let symbol = bar.symbol().clone();
        let previous = self.last_close.insert(symbol.clone(), bar.close());
        let Some(previous) = previous else {
            return;
        };
        if ctx.open_orders().iter().any(|o| o.symbol() == &symbol) {
            return;
        }

        let held = ctx
            .position(&symbol)
            .map_or(Quantity::ZERO, |p| p.quantity());
        let intent = if held.is_zero() && bar.close() > previous {
            OrderIntent::market(symbol, Side::Long, Quantity::from_i64(1))
        } else if held.is_positive() && bar.close() < previous {
            OrderIntent::market(symbol, Side::Short, held).reduce_only()
        } else {
            return;
        };

        if let Err(err) = ctx.submit_order(intent) {
            tracing::warn!(error = %err, "Demo order refused");
        }
    }

    fn on_order_update(&mut self, _ctx: &mut StrategyContext<'_>, order: &Order) {
        tracing::debug!(order_id = %order.id(), status = %order.status(), "Order update");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("WUKONG_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = load_config(Some(&config_path))
        .with_context(|| format!("loading configuration from {config_path}"))?;

    let _telemetry = init_telemetry(&config.observability.logging);
    init_metrics(&config.observability.metrics)?;

    tracing::info!(
        config = %config_path,
        mode = %config.session.mode,
        timeframe = %config.session.timeframe,
        "Starting WuKong engine"
    );

    let bars_path = require_env("WUKONG_BARS")?;
    let mut bars = read_bars(&bars_path)?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let container = SessionContainer::new(config.clone())
        .with_cancellation(cancel)
        .with_configured_audit()
        .await?;
    let strategy = Box::new(MomentumDemo::default());

    let report = match config.session.mode {
        Mode::Backtest => container.backtest(bars, strategy)?.run().await?,
        Mode::Sandbox => {
            let (feed, bar_rx) = mpsc::channel(FEED_CAPACITY);
            let session = container.sandbox(bar_rx, strategy)?;
            bars.sort_by(|a, b| {
                a.close_time()
                    .cmp(&b.close_time())
                    .then_with(|| a.symbol().cmp(b.symbol()))
            });
            tokio::spawn(async move {
                for bar in bars {
                    if feed.send(bar).await.is_err() {
                        break;
                    }
                }
            });
            session.run().await?
        }
        Mode::Real => bail!("REAL mode needs a venue adapter and this binary bundles none"),
    };

    log_summary(&report);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn log_summary(report: &SessionReport) {
    tracing::info!(
        session_id = %report.session_id,
        bars = report.bars_processed,
        orders = report.orders.len(),
        fills = report.fills.len(),
        inconsistencies = report.inconsistencies.len(),
        halted = report.halted,
        realized_pnl = %report.realized_pnl(),
        fees = %report.total_fees(),
        "Session finished"
    );
}
