//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier (UUID v4, no dashes).
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(OrderId, "Unique identifier for an order (engine internal).");
define_id!(FillId, "Unique identifier for a single fill.");
define_id!(VenueOrderId, "Venue's identifier for an accepted order.");
define_id!(SessionId, "Identifier for one engine run.");

/// Source of identifiers for one session.
///
/// Backtests use a zero-padded counter so repeated runs produce identical ids;
/// live sessions draw random UUIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSequence {
    /// `PREFIX-000001`, `PREFIX-000002`, ...
    Sequential {
        /// Prefix placed before the counter.
        prefix: &'static str,
        /// Next counter value.
        next: u64,
    },
    /// UUID v4 in simple form.
    Random,
}

impl IdSequence {
    /// Deterministic counter starting at 1.
    #[must_use]
    pub const fn sequential(prefix: &'static str) -> Self {
        Self::Sequential { prefix, next: 1 }
    }

    /// Random UUID source.
    #[must_use]
    pub const fn random() -> Self {
        Self::Random
    }

    /// Produce the next raw identifier.
    pub fn next_id(&mut self) -> String {
        match self {
            Self::Sequential { prefix, next } => {
                let id = format!("{prefix}-{next:06}");
                *next += 1;
                id
            }
            Self::Random => uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}
