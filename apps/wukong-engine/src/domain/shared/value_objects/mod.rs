//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod identifiers;
mod price;
mod quantity;
mod symbol;
mod timestamp;

pub use identifiers::{FillId, IdSequence, OrderId, SessionId, VenueOrderId};
pub use price::Price;
pub use quantity::Quantity;
pub use symbol::Symbol;
pub use timestamp::Timestamp;
