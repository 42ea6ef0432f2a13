//! Order Execution Value Objects

mod fill;
mod fill_progress;
mod order_side;
mod order_status;
mod order_type;
mod reasons;

pub use fill::Fill;
pub use fill_progress::FillProgress;
pub use order_side::Side;
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use reasons::{CancelReason, RejectReason};
