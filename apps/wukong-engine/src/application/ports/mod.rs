//! Application Ports (Driven)
//!
//! Interfaces the engine uses to reach backends, venues, market data and
//! the audit trail.

mod audit_port;
mod bar_clock;
mod execution_backend;
mod venue_port;

pub use audit_port::{AuditError, AuditPort, NoOpAudit};
pub use bar_clock::{BarClock, ClockError};
pub use execution_backend::{
    BackendError, BackendOrderState, ExecutionBackend, ExecutionReport, ReportReceiver,
    ReportSender, SubmitRequest, report_channel,
};
#[cfg(test)]
pub use venue_port::MockVenuePort;
pub use venue_port::{VenueError, VenuePort};
