//! Shared Domain Types
//!
//! Value objects and errors shared across bounded contexts.

pub mod errors;
pub mod value_objects;

pub use errors::DomainError;
pub use value_objects::{
    FillId, IdSequence, OrderId, Price, Quantity, SessionId, Symbol, Timestamp, VenueOrderId,
};
