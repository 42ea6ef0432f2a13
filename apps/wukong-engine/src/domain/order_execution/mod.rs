//! Order Execution Bounded Context
//!
//! Manages the order lifecycle from strategy intent to a terminal status.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: the root entity owning status and fills
//! - **Order State Machine**: the only table of legal transitions
//! - **Domain Events**: one per status change, drained by the engine

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;

pub use aggregate::{Order, OrderIntent};
pub use errors::OrderError;
pub use events::{
    OrderAccepted, OrderCanceled, OrderCreated, OrderEvent, OrderFilled, OrderPartiallyFilled,
    OrderRejected, OrderSubmitted,
};
pub use services::OrderStateMachine;
pub use value_objects::{
    CancelReason, Fill, FillProgress, OrderStatus, OrderType, RejectReason, Side,
};
