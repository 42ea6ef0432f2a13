//! Shared fixtures for the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use wukong_engine::config::load_config_from_string;
use wukong_engine::{
    Bar, Config, ErrorCode, Ohlc, Order, OrderId, OrderIntent, Price, Strategy, StrategyContext,
    Symbol, TimeFrame, Timestamp, read_bars,
};

/// Load a bar fixture from `tests/fixtures`.
pub fn fixture_bars(name: &str) -> Vec<Bar> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(name);
    read_bars(&path).unwrap_or_else(|e| panic!("Failed to load fixture {}: {e}", path.display()))
}

/// Hourly bar closing at `close_time` with the given OHLC and volume.
pub fn hourly(symbol: &str, close_time: &str, ohlc: [i64; 4], volume: i64) -> Bar {
    let [open, high, low, close] = ohlc.map(Price::from_i64);
    Bar::new(
        Symbol::new(symbol),
        TimeFrame::Hour1,
        Timestamp::parse(close_time).unwrap(),
        Ohlc::new(open, high, low, close),
        Decimal::from(volume),
    )
    .unwrap()
}

/// Config for `mode` on hourly BTC bars, plus any extra YAML sections.
pub fn config(mode: &str, extra: &str) -> Config {
    let yaml = format!(
        "session:\n  mode: {mode}\n  timeframe: 1h\n  instruments: [BTC]\n  shutdown_grace_ms: 200\n{extra}"
    );
    load_config_from_string(&yaml).unwrap()
}

/// One scripted strategy action.
#[derive(Debug, Clone)]
pub enum Step {
    /// Submit this intent.
    Submit(OrderIntent),
    /// Cancel the most recently submitted order.
    CancelLatest,
}

/// What the script observed, readable after the session consumed it.
#[derive(Debug, Default)]
pub struct Observed {
    pub submitted: Vec<OrderId>,
    pub refused: Vec<ErrorCode>,
    pub updates: Vec<Order>,
    pub bars: usize,
    pub stopped: bool,
}

/// Strategy that replays fixed steps at start and after given bars.
#[derive(Debug, Default)]
pub struct Script {
    at_start: Vec<Step>,
    after_bar: BTreeMap<usize, Vec<Step>>,
    observed: Arc<Mutex<Observed>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `step` from `on_start`.
    pub fn at_start(mut self, step: Step) -> Self {
        self.at_start.push(step);
        self
    }

    /// Run `step` from `on_bar` of the `n`th bar (1-based).
    pub fn on_bar(mut self, n: usize, step: Step) -> Self {
        self.after_bar.entry(n).or_default().push(step);
        self
    }

    pub fn observed(&self) -> Arc<Mutex<Observed>> {
        Arc::clone(&self.observed)
    }

    fn run(&self, ctx: &mut StrategyContext<'_>, steps: &[Step]) {
        let mut observed = self.observed.lock();
        for step in steps {
            let result = match step {
                Step::Submit(intent) => ctx
                    .submit_order(intent.clone())
                    .map(|id| observed.submitted.push(id)),
                Step::CancelLatest => match observed.submitted.last() {
                    Some(id) => ctx.cancel_order(id),
                    None => Ok(()),
                },
            };
            if let Err(err) = result {
                observed.refused.push(err.code());
            }
        }
    }
}

impl Strategy for Script {
    fn on_start(&mut self, ctx: &mut StrategyContext<'_>) {
        let steps = std::mem::take(&mut self.at_start);
        self.run(ctx, &steps);
    }

    fn on_bar(&mut self, ctx: &mut StrategyContext<'_>, _bar: &Bar) {
        let n = {
            let mut observed = self.observed.lock();
            observed.bars += 1;
            observed.bars
        };
        if let Some(steps) = self.after_bar.remove(&n) {
            self.run(ctx, &steps);
        }
    }

    fn on_order_update(&mut self, _ctx: &mut StrategyContext<'_>, order: &Order) {
        self.observed.lock().updates.push(order.clone());
    }

    fn on_stop(&mut self, _ctx: &mut StrategyContext<'_>) {
        self.observed.lock().stopped = true;
    }
}
