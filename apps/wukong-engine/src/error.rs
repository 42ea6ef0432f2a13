//! Error taxonomy for the execution core.
//!
//! Every failure the engine reports carries an [`ErrorCode`], and every code
//! belongs to exactly one [`ErrorCategory`]:
//!
//! | Category | Raised when | Strategy observes |
//! |----------|-------------|-------------------|
//! | `Validation` | Malformed intent at `submit_order` | `Err` from the call, no order enters the machine |
//! | `Rejection` | Backend or venue declines the order | Terminal `Rejected` status |
//! | `Timeout` | Venue acknowledgment deadline passes | Terminal `Rejected` status |
//! | `Inconsistency` | Fill for a terminal/unknown order, overfill, reduce-only breach | Nothing; logged and audited for the operator |
//! | `Internal` | Backend or clock failure | Session ends with an error |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::{BackendError, ClockError};
use crate::domain::order_execution::OrderError;
use crate::domain::position::LedgerError;
use crate::domain::shared::OrderId;

/// Broad class of an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Caught before the order exists.
    Validation,
    /// Declined by the backend or venue.
    Rejection,
    /// A report that cannot be reconciled with known state.
    Inconsistency,
    /// Acknowledgment deadline exceeded.
    Timeout,
    /// Anything else.
    Internal,
}

/// Error codes for the execution core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation
    /// Invalid order parameters (price, quantity, symbol).
    InvalidOrderParams,
    /// Instrument is not configured for this session.
    UnknownInstrument,
    /// Reduce-only intent without matching opposite exposure.
    ReduceOnlyExposure,
    /// Intent needs more margin than the account has available.
    InsufficientMargin,
    /// Order id not known to the session.
    OrderNotFound,
    /// Cancel targeted a terminal order.
    AlreadyTerminal,
    /// The session has stopped accepting intents.
    SessionStopped,

    // Rejection
    /// Backend or venue rejected the order.
    OrderRejected,
    /// Transient venue errors outlasted the retry budget.
    RetriesExhausted,

    // Timeout
    /// No acknowledgment before the deadline.
    AckTimeout,

    // Inconsistency
    /// Fill arrived for an order that is already terminal.
    FillForTerminalOrder,
    /// Fill or report arrived for an order the session never created.
    UnknownOrderReport,
    /// Fill quantity exceeds the order's open quantity.
    Overfill,
    /// Reduce-only fill would grow or flip the position.
    ReduceOnlyViolation,
    /// Report does not fit the order's current status.
    UnexpectedReport,

    // Internal
    /// Backend unavailable or failed.
    BackendFailure,
    /// Market data clock failed.
    ClockFailure,
    /// Internal error.
    InternalError,
}

impl ErrorCode {
    /// Category this code belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidOrderParams
            | Self::UnknownInstrument
            | Self::ReduceOnlyExposure
            | Self::InsufficientMargin
            | Self::OrderNotFound
            | Self::AlreadyTerminal
            | Self::SessionStopped => ErrorCategory::Validation,

            Self::OrderRejected | Self::RetriesExhausted => ErrorCategory::Rejection,

            Self::AckTimeout => ErrorCategory::Timeout,

            Self::FillForTerminalOrder
            | Self::UnknownOrderReport
            | Self::Overfill
            | Self::ReduceOnlyViolation
            | Self::UnexpectedReport => ErrorCategory::Inconsistency,

            Self::BackendFailure | Self::ClockFailure | Self::InternalError => {
                ErrorCategory::Internal
            }
        }
    }

    /// Stable reason string for logs and audit records.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidOrderParams => "INVALID_ORDER_PARAMS",
            Self::UnknownInstrument => "UNKNOWN_INSTRUMENT",
            Self::ReduceOnlyExposure => "REDUCE_ONLY_EXPOSURE",
            Self::InsufficientMargin => "INSUFFICIENT_MARGIN",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::AlreadyTerminal => "ALREADY_TERMINAL",
            Self::SessionStopped => "SESSION_STOPPED",
            Self::OrderRejected => "ORDER_REJECTED",
            Self::RetriesExhausted => "RETRIES_EXHAUSTED",
            Self::AckTimeout => "ACK_TIMEOUT",
            Self::FillForTerminalOrder => "FILL_FOR_TERMINAL_ORDER",
            Self::UnknownOrderReport => "UNKNOWN_ORDER_REPORT",
            Self::Overfill => "OVERFILL",
            Self::ReduceOnlyViolation => "REDUCE_ONLY_VIOLATION",
            Self::UnexpectedReport => "UNEXPECTED_REPORT",
            Self::BackendFailure => "BACKEND_FAILURE",
            Self::ClockFailure => "CLOCK_FAILURE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// An engine error with a code and key/value context.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct EngineError {
    code: ErrorCode,
    message: String,
    context: Vec<(String, String)>,
}

impl EngineError {
    /// Create a new engine error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Look up one context value.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True for defect signals that must reach an operator.
    #[must_use]
    pub fn is_inconsistency(&self) -> bool {
        self.category() == ErrorCategory::Inconsistency
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

/// Convenience constructors for common errors.
impl EngineError {
    /// Malformed order intent.
    #[must_use]
    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidOrderParams, message)
    }

    /// Order id unknown to the session.
    #[must_use]
    pub fn order_not_found(order_id: &OrderId) -> Self {
        Self::new(ErrorCode::OrderNotFound, format!("Order {order_id} not found"))
            .with_context("order_id", order_id.as_str())
    }

    /// Report that cannot be reconciled with the order's state.
    #[must_use]
    pub fn inconsistency(code: ErrorCode, order_id: &OrderId, message: impl Into<String>) -> Self {
        Self::new(code, message).with_context("order_id", order_id.as_str())
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<OrderError> for EngineError {
    fn from(err: OrderError) -> Self {
        let code = match &err {
            OrderError::InvalidParameters { .. } => ErrorCode::InvalidOrderParams,
            OrderError::AlreadyTerminal { .. } => ErrorCode::AlreadyTerminal,
            OrderError::FillExceedsRemaining { .. } => ErrorCode::Overfill,
            OrderError::CannotFill { status, .. } if status.is_terminal() => {
                ErrorCode::FillForTerminalOrder
            }
            OrderError::CannotFill { .. } | OrderError::InvalidStateTransition { .. } => {
                ErrorCode::UnexpectedReport
            }
        };
        let error = Self::new(code, err.to_string());
        match &err {
            OrderError::CannotFill { order_id, .. }
            | OrderError::AlreadyTerminal { order_id, .. }
            | OrderError::FillExceedsRemaining { order_id, .. } => {
                error.with_context("order_id", order_id.as_str())
            }
            OrderError::InvalidParameters { field, .. } => error.with_context("field", field.as_str()),
            OrderError::InvalidStateTransition { .. } => error,
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        let order_id = match &err {
            LedgerError::ReduceOnlyViolation { order_id, .. } | LedgerError::EmptyFill { order_id } => {
                order_id.clone()
            }
        };
        let code = match &err {
            LedgerError::ReduceOnlyViolation { .. } => ErrorCode::ReduceOnlyViolation,
            LedgerError::EmptyFill { .. } => ErrorCode::UnexpectedReport,
        };
        Self::inconsistency(code, &order_id, err.to_string())
    }
}

impl From<BackendError> for EngineError {
    fn from(err: BackendError) -> Self {
        match &err {
            BackendError::Rejected { order_id, .. } => {
                Self::new(ErrorCode::OrderRejected, err.to_string())
                    .with_context("order_id", order_id.as_str())
            }
            BackendError::AlreadyTerminal { order_id } => {
                Self::new(ErrorCode::AlreadyTerminal, err.to_string())
                    .with_context("order_id", order_id.as_str())
            }
            BackendError::UnknownOrder { order_id } => {
                Self::new(ErrorCode::OrderNotFound, err.to_string())
                    .with_context("order_id", order_id.as_str())
            }
            BackendError::Unavailable(_) => Self::new(ErrorCode::BackendFailure, err.to_string()),
        }
    }
}

impl From<ClockError> for EngineError {
    fn from(err: ClockError) -> Self {
        Self::new(ErrorCode::ClockFailure, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::OrderStatus;

    #[test]
    fn every_code_has_one_category() {
        assert_eq!(ErrorCode::InvalidOrderParams.category(), ErrorCategory::Validation);
        assert_eq!(ErrorCode::InsufficientMargin.category(), ErrorCategory::Validation);
        assert_eq!(ErrorCode::OrderRejected.category(), ErrorCategory::Rejection);
        assert_eq!(ErrorCode::AckTimeout.category(), ErrorCategory::Timeout);
        assert_eq!(ErrorCode::FillForTerminalOrder.category(), ErrorCategory::Inconsistency);
        assert_eq!(ErrorCode::ClockFailure.category(), ErrorCategory::Internal);
    }

    #[test]
    fn display_uses_reason() {
        let err = EngineError::invalid_order("quantity must be positive");
        assert_eq!(err.to_string(), "[INVALID_ORDER_PARAMS] quantity must be positive");
    }

    #[test]
    fn context_lookup() {
        let err = EngineError::order_not_found(&OrderId::new("ORD-000009"));
        assert_eq!(err.context_value("order_id"), Some("ORD-000009"));
        assert_eq!(err.context_value("missing"), None);
    }

    #[test]
    fn post_terminal_fill_maps_to_inconsistency() {
        let err: EngineError = OrderError::CannotFill {
            order_id: OrderId::new("ORD-1"),
            status: OrderStatus::Canceled,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::FillForTerminalOrder);
        assert!(err.is_inconsistency());
    }

    #[test]
    fn fill_before_ack_is_unexpected() {
        let err: EngineError = OrderError::CannotFill {
            order_id: OrderId::new("ORD-1"),
            status: OrderStatus::Submitted,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::UnexpectedReport);
    }

    #[test]
    fn serializes_for_audit() {
        let err = EngineError::internal("boom").with_context("k", "v");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("INTERNAL_ERROR"));
        let back: EngineError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
