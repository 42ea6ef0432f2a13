//! Append-only JSON Lines audit sink.
//!
//! One record per line, tagged by `kind`:
//!
//! ```text
//! {"kind":"order","order":{...}}
//! {"kind":"fill","fill":{...}}
//! {"kind":"inconsistency","error":{...}}
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::application::ports::{AuditError, AuditPort};
use crate::domain::order_execution::{Fill, Order};
use crate::error::EngineError;

/// One line of the audit file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditRecord {
    /// Terminal order.
    Order {
        /// Final order state.
        order: Box<Order>,
    },
    /// Applied fill.
    Fill {
        /// The fill.
        fill: Fill,
    },
    /// Unreconciled report.
    Inconsistency {
        /// What went wrong.
        error: EngineError,
    },
}

/// Writes audit records to a file, appending across runs.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditSink {
    /// Open `path` for appending, creating it and its parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Io`] if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::info!(path = %path.display(), "Audit sink opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// File being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl AuditPort for JsonlAuditSink {
    async fn record_order(&self, order: &Order) -> Result<(), AuditError> {
        self.append(&AuditRecord::Order {
            order: Box::new(order.clone()),
        })
        .await
    }

    async fn record_fill(&self, fill: &Fill) -> Result<(), AuditError> {
        self.append(&AuditRecord::Fill { fill: fill.clone() }).await
    }

    async fn record_inconsistency(&self, error: &EngineError) -> Result<(), AuditError> {
        self.append(&AuditRecord::Inconsistency {
            error: error.clone(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{FillId, OrderId, Price, Quantity, Timestamp};
    use crate::error::ErrorCode;

    fn fill(id: &str) -> Fill {
        Fill::new(
            FillId::new(id),
            OrderId::new("ORD-000001"),
            Quantity::from_i64(2),
            Price::from_i64(50),
            Timestamp::from_millis(60_000).unwrap(),
        )
    }

    #[tokio::test]
    async fn appends_one_tagged_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit/run.jsonl");
        let sink = JsonlAuditSink::open(&path).await.unwrap();

        sink.record_fill(&fill("FILL-000001")).await.unwrap();
        sink.record_inconsistency(&EngineError::inconsistency(
            ErrorCode::FillForTerminalOrder,
            &OrderId::new("ORD-000001"),
            "fill after cancel",
        ))
        .await
        .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(first, AuditRecord::Fill { ref fill } if fill.fill_id().as_str() == "FILL-000001"));
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "inconsistency");
    }

    #[tokio::test]
    async fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");

        JsonlAuditSink::open(&path)
            .await
            .unwrap()
            .record_fill(&fill("FILL-000001"))
            .await
            .unwrap();
        JsonlAuditSink::open(&path)
            .await
            .unwrap()
            .record_fill(&fill("FILL-000002"))
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
