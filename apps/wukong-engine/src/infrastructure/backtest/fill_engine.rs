//! Bar-driven fill simulation shared by the backtest backend and the paper venue.
//!
//! A resting order is only matched against bars that arrive after it was
//! placed. Market orders take the bar open. Limit orders fill at their limit
//! price when the bar range touches it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::SubmitRequest;
use crate::domain::market_data::Bar;
use crate::domain::order_execution::{Fill, OrderType};
use crate::domain::shared::{FillId, IdSequence, OrderId, Price, Quantity, Timestamp};

const BPS_DIVISOR: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Tunables for simulated matching.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FillModel {
    /// Largest share of a bar's volume the book may take; `None` fills fully.
    pub max_volume_participation: Option<Decimal>,
    /// Commission in basis points of notional.
    pub commission_bps: Decimal,
}

impl FillModel {
    /// Fill everything that touches, free of charge.
    #[must_use]
    pub const fn frictionless() -> Self {
        Self {
            max_volume_participation: None,
            commission_bps: Decimal::ZERO,
        }
    }

    /// Cap fills at a share of bar volume.
    #[must_use]
    pub const fn with_participation(mut self, share: Decimal) -> Self {
        self.max_volume_participation = Some(share);
        self
    }

    /// Charge a commission per fill.
    #[must_use]
    pub const fn with_commission_bps(mut self, bps: Decimal) -> Self {
        self.commission_bps = bps;
        self
    }

    /// Quantity the whole book may take from `bar`, or `None` for no cap.
    #[must_use]
    pub fn bar_capacity(&self, bar: &Bar) -> Option<Quantity> {
        self.max_volume_participation
            .map(|share| Quantity::new((bar.volume() * share).max(Decimal::ZERO)))
    }

    /// Commission for a fill.
    #[must_use]
    pub fn fee(&self, quantity: Quantity, price: Price) -> Decimal {
        if self.commission_bps.is_zero() {
            return Decimal::ZERO;
        }
        price * quantity * self.commission_bps / BPS_DIVISOR
    }

    /// Match one resting order against one bar.
    #[must_use]
    pub fn simulate(&self, order: &RestingOrder, bar: &Bar, capacity: Option<Quantity>) -> FillResult {
        let leaves = order.leaves();
        let price = match (order.request.order_type, order.request.limit_price) {
            (OrderType::Market, _) => bar.open(),
            (OrderType::Limit, Some(limit)) if bar.touches(limit) => limit,
            (OrderType::Limit, Some(_)) => return FillResult::no_fill(leaves, "limit not touched"),
            (OrderType::Limit, None) => return FillResult::no_fill(leaves, "limit price missing"),
        };

        let quantity = capacity.map_or(leaves, |cap| leaves.min(cap));
        if quantity.is_zero() {
            return FillResult::no_fill(leaves, "no volume left in bar");
        }
        let fee = self.fee(quantity, price);
        if quantity < leaves {
            FillResult::partial_fill(price, quantity, leaves - quantity, fee)
        } else {
            FillResult::full_fill(price, quantity, fee)
        }
    }
}

/// Outcome of matching one order against one bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillResult {
    /// Whether anything matched.
    pub filled: bool,
    /// Execution price when filled.
    pub price: Option<Price>,
    /// Quantity matched.
    pub filled_quantity: Quantity,
    /// Quantity still open afterwards.
    pub remaining_quantity: Quantity,
    /// Matched less than the open quantity.
    pub is_partial: bool,
    /// Commission charged.
    pub fee: Decimal,
    /// Note for logs when nothing matched.
    pub reason: &'static str,
}

impl FillResult {
    /// Nothing matched.
    #[must_use]
    pub const fn no_fill(remaining: Quantity, reason: &'static str) -> Self {
        Self {
            filled: false,
            price: None,
            filled_quantity: Quantity::ZERO,
            remaining_quantity: remaining,
            is_partial: false,
            fee: Decimal::ZERO,
            reason,
        }
    }

    /// All open quantity matched.
    #[must_use]
    pub const fn full_fill(price: Price, quantity: Quantity, fee: Decimal) -> Self {
        Self {
            filled: true,
            price: Some(price),
            filled_quantity: quantity,
            remaining_quantity: Quantity::ZERO,
            is_partial: false,
            fee,
            reason: "filled",
        }
    }

    /// Some open quantity matched.
    #[must_use]
    pub const fn partial_fill(
        price: Price,
        filled: Quantity,
        remaining: Quantity,
        fee: Decimal,
    ) -> Self {
        Self {
            filled: true,
            price: Some(price),
            filled_quantity: filled,
            remaining_quantity: remaining,
            is_partial: true,
            fee,
            reason: "volume capped",
        }
    }
}

/// An order waiting in the simulated book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingOrder {
    /// Order as submitted.
    pub request: SubmitRequest,
    /// Quantity matched so far.
    pub filled: Quantity,
}

impl RestingOrder {
    /// Place a new order with nothing filled.
    #[must_use]
    pub const fn new(request: SubmitRequest) -> Self {
        Self {
            request,
            filled: Quantity::ZERO,
        }
    }

    /// Quantity still open.
    #[must_use]
    pub fn leaves(&self) -> Quantity {
        self.request.quantity.saturating_sub(self.filled)
    }
}

/// Open orders in submission order.
#[derive(Debug, Default)]
pub struct RestingBook {
    orders: Vec<RestingOrder>,
}

impl RestingBook {
    /// Empty book.
    #[must_use]
    pub const fn new() -> Self {
        Self { orders: Vec::new() }
    }

    /// Queue an order behind everything already resting.
    pub fn add(&mut self, request: SubmitRequest) {
        self.orders.push(RestingOrder::new(request));
    }

    /// Take an order out of the book.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<RestingOrder> {
        let index = self
            .orders
            .iter()
            .position(|o| &o.request.order_id == order_id)?;
        Some(self.orders.remove(index))
    }

    /// Whether the order is still resting.
    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.iter().any(|o| &o.request.order_id == order_id)
    }

    /// Look up a resting order.
    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&RestingOrder> {
        self.orders.iter().find(|o| &o.request.order_id == order_id)
    }

    /// Number of resting orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// True if nothing rests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Match every resting order for `bar`'s symbol, oldest first.
    ///
    /// Volume capacity is shared by all orders on the bar. Fully filled orders
    /// leave the book. Fills are stamped with `at`.
    pub fn match_bar(
        &mut self,
        bar: &Bar,
        model: &FillModel,
        fill_ids: &mut IdSequence,
        at: Timestamp,
    ) -> Vec<Fill> {
        let mut capacity = model.bar_capacity(bar);
        let mut fills = Vec::new();

        for order in self
            .orders
            .iter_mut()
            .filter(|o| o.request.symbol == *bar.symbol())
        {
            let result = model.simulate(order, bar, capacity);
            let (true, Some(price)) = (result.filled, result.price) else {
                continue;
            };

            order.filled += result.filled_quantity;
            if let Some(cap) = capacity.as_mut() {
                *cap = cap.saturating_sub(result.filled_quantity);
            }
            fills.push(
                Fill::new(
                    FillId::new(fill_ids.next_id()),
                    order.request.order_id.clone(),
                    result.filled_quantity,
                    price,
                    at,
                )
                .with_fee(result.fee),
            );
        }

        self.orders.retain(|o| o.leaves().is_positive());
        fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_data::{Ohlc, TimeFrame};
    use crate::domain::order_execution::Side;
    use crate::domain::shared::Symbol;
    use rust_decimal_macros::dec;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn bar(symbol: &str, ohlc: [i64; 4], volume: Decimal) -> Bar {
        Bar::new(
            Symbol::new(symbol),
            TimeFrame::Minute1,
            ts("2024-01-01T00:01:00Z"),
            Ohlc::new(
                Price::from_i64(ohlc[0]),
                Price::from_i64(ohlc[1]),
                Price::from_i64(ohlc[2]),
                Price::from_i64(ohlc[3]),
            ),
            volume,
        )
        .unwrap()
    }

    fn request(id: &str, symbol: &str, order_type: OrderType, qty: i64, limit: Option<i64>) -> SubmitRequest {
        SubmitRequest {
            order_id: OrderId::new(id),
            symbol: Symbol::new(symbol),
            side: Side::Long,
            order_type,
            quantity: Quantity::from_i64(qty),
            limit_price: limit.map(Price::from_i64),
            reduce_only: false,
            leverage: rust_decimal::Decimal::ONE,
            submitted_at: ts("2024-01-01T00:00:00Z"),
        }
    }

    #[test]
    fn market_order_fills_at_open() {
        let model = FillModel::frictionless();
        let order = RestingOrder::new(request("A", "BTC", OrderType::Market, 10, None));

        let result = model.simulate(&order, &bar("BTC", [100, 105, 95, 102], dec!(1000)), None);

        assert!(result.filled);
        assert!(!result.is_partial);
        assert_eq!(result.price, Some(Price::from_i64(100)));
        assert_eq!(result.filled_quantity, Quantity::from_i64(10));
    }

    #[test]
    fn limit_order_needs_touch() {
        let model = FillModel::frictionless();
        let order = RestingOrder::new(request("A", "BTC", OrderType::Limit, 5, Some(50)));

        let miss = model.simulate(&order, &bar("BTC", [52, 55, 52, 54], dec!(10)), None);
        let hit = model.simulate(&order, &bar("BTC", [52, 53, 48, 50], dec!(10)), None);

        assert!(!miss.filled);
        assert_eq!(miss.remaining_quantity, Quantity::from_i64(5));
        assert_eq!(hit.price, Some(Price::from_i64(50)));
    }

    #[test]
    fn participation_caps_and_splits_fill() {
        let model = FillModel::frictionless().with_participation(dec!(0.1));
        let order = RestingOrder::new(request("A", "BTC", OrderType::Market, 10, None));

        let result = model.simulate(
            &order,
            &bar("BTC", [100, 101, 99, 100], dec!(40)),
            model.bar_capacity(&bar("BTC", [100, 101, 99, 100], dec!(40))),
        );

        assert!(result.is_partial);
        assert_eq!(result.filled_quantity, Quantity::from_i64(4));
        assert_eq!(result.remaining_quantity, Quantity::from_i64(6));
    }

    #[test]
    fn commission_charged_in_basis_points() {
        let model = FillModel::frictionless().with_commission_bps(dec!(10));
        assert_eq!(model.fee(Quantity::from_i64(10), Price::from_i64(100)), dec!(1));
    }

    #[test]
    fn book_matches_in_submission_order_with_shared_capacity() {
        let model = FillModel::frictionless().with_participation(dec!(0.5));
        let mut book = RestingBook::new();
        let mut ids = IdSequence::sequential("FILL");
        book.add(request("A", "BTC", OrderType::Market, 3, None));
        book.add(request("B", "BTC", OrderType::Market, 3, None));

        let fills = book.match_bar(
            &bar("BTC", [100, 101, 99, 100], dec!(8)),
            &model,
            &mut ids,
            ts("2024-01-01T00:01:00Z"),
        );

        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].order_id().as_str(), "A");
        assert_eq!(fills[0].quantity(), Quantity::from_i64(3));
        assert_eq!(fills[0].fill_id().as_str(), "FILL-000001");
        assert_eq!(fills[1].quantity(), Quantity::from_i64(1));
        assert_eq!(book.len(), 1);
        assert_eq!(book.get(&OrderId::new("B")).unwrap().leaves(), Quantity::from_i64(2));
    }

    #[test]
    fn other_symbols_are_left_alone() {
        let mut book = RestingBook::new();
        let mut ids = IdSequence::sequential("FILL");
        book.add(request("A", "ETH", OrderType::Market, 1, None));

        let fills = book.match_bar(
            &bar("BTC", [100, 101, 99, 100], dec!(8)),
            &FillModel::default(),
            &mut ids,
            ts("2024-01-01T00:01:00Z"),
        );

        assert!(fills.is_empty());
        assert!(book.contains(&OrderId::new("A")));
    }

    proptest::proptest! {
        #[test]
        fn shared_capacity_is_never_exceeded(
            sizes in proptest::collection::vec(1i64..50, 1..8),
            volume in 0i64..200,
            percent in 1i64..=100,
        ) {
            let model = FillModel::frictionless().with_participation(Decimal::new(percent, 2));
            let mut book = RestingBook::new();
            let mut ids = IdSequence::sequential("FILL");
            for (i, qty) in sizes.iter().enumerate() {
                book.add(request(&format!("O{i}"), "BTC", OrderType::Market, *qty, None));
            }
            let bar = bar("BTC", [100, 101, 99, 100], Decimal::from(volume));

            let fills = book.match_bar(&bar, &model, &mut ids, ts("2024-01-01T00:01:00Z"));

            let total: Decimal = fills.iter().map(|f| f.quantity().amount()).sum();
            let cap = model.bar_capacity(&bar).unwrap().amount();
            proptest::prop_assert!(total <= cap);
            let ordered: i64 = sizes.iter().sum();
            proptest::prop_assert_eq!(total, cap.min(Decimal::from(ordered)));
        }
    }

    #[test]
    fn remove_takes_order_out() {
        let mut book = RestingBook::new();
        book.add(request("A", "BTC", OrderType::Market, 1, None));

        assert!(book.remove(&OrderId::new("A")).is_some());
        assert!(book.remove(&OrderId::new("A")).is_none());
        assert!(book.is_empty());
    }
}
