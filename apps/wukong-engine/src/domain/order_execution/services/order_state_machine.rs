//! Order State Machine Service
//!
//! The single table of legal status transitions. The aggregate consults it
//! before every mutation.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            (OrderStatus::Created, OrderStatus::Submitted)
                | (
                    OrderStatus::Submitted,
                    OrderStatus::Pending | OrderStatus::Rejected
                )
                | (
                    OrderStatus::Pending | OrderStatus::Partial,
                    OrderStatus::Partial | OrderStatus::Completed | OrderStatus::Canceled
                )
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        match from {
            OrderStatus::Completed => format!("Order is already completed, cannot transition to {to}"),
            OrderStatus::Canceled => format!("Order is canceled, cannot transition to {to}"),
            OrderStatus::Rejected => format!("Order was rejected, cannot transition to {to}"),
            _ => format!("Invalid transition from {from} to {to}"),
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        match from {
            OrderStatus::Created => vec![OrderStatus::Submitted],
            OrderStatus::Submitted => vec![OrderStatus::Pending, OrderStatus::Rejected],
            OrderStatus::Pending | OrderStatus::Partial => vec![
                OrderStatus::Partial,
                OrderStatus::Completed,
                OrderStatus::Canceled,
            ],
            OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Canceled => vec![],
        }
    }

    /// Whether `path` is a walk through the machine starting at Created.
    #[must_use]
    pub fn is_valid_path(path: &[OrderStatus]) -> bool {
        path.first() == Some(&OrderStatus::Created)
            && path
                .windows(2)
                .all(|pair| Self::is_valid_transition(pair[0], pair[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [OrderStatus; 7] = [
        OrderStatus::Created,
        OrderStatus::Submitted,
        OrderStatus::Pending,
        OrderStatus::Partial,
        OrderStatus::Completed,
        OrderStatus::Rejected,
        OrderStatus::Canceled,
    ];

    #[test]
    fn happy_path() {
        assert!(OrderStateMachine::is_valid_path(&[
            OrderStatus::Created,
            OrderStatus::Submitted,
            OrderStatus::Pending,
            OrderStatus::Partial,
            OrderStatus::Partial,
            OrderStatus::Completed,
        ]));
    }

    #[test]
    fn no_skips() {
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Created,
            OrderStatus::Completed
        ));
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Created,
            OrderStatus::Pending
        ));
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Submitted,
            OrderStatus::Completed
        ));
        assert!(OrderStateMachine::validate_transition(OrderStatus::Created, OrderStatus::Completed).is_err());
    }

    #[test]
    fn pending_cannot_be_rejected() {
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Rejected
        ));
    }

    #[test]
    fn partial_never_returns_to_pending() {
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Partial,
            OrderStatus::Pending
        ));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in ALL.into_iter().filter(OrderStatus::is_terminal) {
            assert!(OrderStateMachine::valid_next_states(from).is_empty());
            for to in ALL {
                assert!(!OrderStateMachine::is_valid_transition(from, to));
            }
        }
    }

    #[test]
    fn terminal_reason_names_state() {
        let reason = OrderStateMachine::transition_error_reason(
            OrderStatus::Canceled,
            OrderStatus::Partial,
        );
        assert!(reason.contains("canceled"));
    }

    proptest! {
        #[test]
        fn next_states_agree_with_table(from in 0usize..7, to in 0usize..7) {
            let (from, to) = (ALL[from], ALL[to]);
            prop_assert_eq!(
                OrderStateMachine::valid_next_states(from).contains(&to),
                OrderStateMachine::is_valid_transition(from, to)
            );
        }
    }
}
