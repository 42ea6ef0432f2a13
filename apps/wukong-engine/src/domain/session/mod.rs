//! Session Bounded Context
//!
//! What a single run of the engine is bound to.

mod mode;

pub use mode::Mode;
