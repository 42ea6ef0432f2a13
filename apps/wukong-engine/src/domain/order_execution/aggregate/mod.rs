//! Order Execution Aggregates

mod intent;
mod order;

pub use intent::OrderIntent;
pub use order::Order;
