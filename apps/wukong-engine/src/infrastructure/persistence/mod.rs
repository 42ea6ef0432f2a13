//! Audit Adapters
//!
//! Implementations of [`AuditPort`](crate::application::ports::AuditPort).

pub mod in_memory;
pub mod jsonl;

pub use in_memory::InMemoryAuditLog;
pub use jsonl::{AuditRecord, JsonlAuditSink};
