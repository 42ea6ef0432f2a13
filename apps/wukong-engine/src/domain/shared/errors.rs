//! Errors raised while building value objects.

/// A value object or bar could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Field failed validation.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// What was wrong.
        message: String,
    },

    /// Fill progress would break `filled + leaves = requested`.
    #[error("{aggregate} would break '{invariant}' ({state})")]
    InvariantViolation {
        /// Owning structure.
        aggregate: String,
        /// Broken rule.
        invariant: String,
        /// Offending values.
        state: String,
    },
}

impl DomainError {
    /// Shorthand for [`DomainError::InvalidValue`].
    #[must_use]
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_names_field() {
        let msg = DomainError::invalid("quantity", "must be positive").to_string();
        assert_eq!(msg, "Invalid value for 'quantity': must be positive");
    }

    #[test]
    fn invariant_names_rule_and_state() {
        let err = DomainError::InvariantViolation {
            aggregate: "FillProgress".to_string(),
            invariant: "fill <= leaves".to_string(),
            state: "fill=6, leaves=5".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "FillProgress would break 'fill <= leaves' (fill=6, leaves=5)"
        );
    }
}
