//! Audit trail configuration.

use serde::{Deserialize, Serialize};

/// Where terminal orders, fills and inconsistencies are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Append-only JSON Lines file. Unset keeps no trail.
    #[serde(default)]
    pub jsonl_path: Option<String>,
}
