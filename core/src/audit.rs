//! JSONL audit log writer for instrumentation attempts.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::record::InstrumentationRecord;

/// Append-only JSONL writer for instrumentation records.
#[derive(Debug, Clone)]
pub struct AuditWriter {
    path: PathBuf,
}

impl AuditWriter {
    /// Create a new writer that appends to the provided path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Absolute path to the JSONL log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the given record as a JSON line, creating parent directories
    /// and the log file if necessary.
    pub async fn append(&self, record: &InstrumentationRecord) -> Result<(), AuditWriterError> {
        self.append_all(std::slice::from_ref(record)).await
    }

    /// Append several records in one open/flush cycle.
    pub async fn append_all(
        &self,
        records: &[InstrumentationRecord],
    ) -> Result<(), AuditWriterError> {
        if records.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut body = String::new();
        for record in records {
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }

        file.write_all(body.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Errors produced while writing the audit log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditWriterError {
    #[error("failed to serialize instrumentation record: {0}")]
    Serialize(String),
    #[error("failed to write audit log: {0}")]
    Io(String),
}

impl From<serde_json::Error> for AuditWriterError {
    fn from(err: serde_json::Error) -> Self {
        AuditWriterError::Serialize(err.to_string())
    }
}

impl From<std::io::Error> for AuditWriterError {
    fn from(err: std::io::Error) -> Self {
        AuditWriterError::Io(err.to_string())
    }
}
