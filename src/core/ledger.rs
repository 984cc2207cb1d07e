use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Final disposition of one processed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Copied,
    Moved,
    Renamed,
    Overwritten,
    Skipped,
    Expanded,
    SourceReadError,
    DestWriteError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copied => "copied",
            Self::Moved => "moved",
            Self::Renamed => "renamed",
            Self::Overwritten => "overwritten",
            Self::Skipped => "skipped",
            Self::Expanded => "expanded",
            Self::SourceReadError => "source-read-error",
            Self::DestWriteError => "dest-write-error",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::SourceReadError | Self::DestWriteError)
    }
}

/// One immutable line of the transparency log
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentRecord {
    pub source_path: String,
    pub identifier: String,
    pub category: String,
    pub target_path: Option<String>,
    pub outcome: Outcome,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Accumulates AssignmentRecords for the duration of a run and flushes them
/// to the transparency log at the end. Records are never mutated once
/// appended; the on-disk log is append-only across runs.
#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<AssignmentRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        source_path: &Path,
        identifier: &str,
        category: &str,
        target_path: Option<&Path>,
        outcome: Outcome,
        detail: Option<String>,
    ) {
        self.records.push(AssignmentRecord {
            source_path: source_path.display().to_string(),
            identifier: identifier.to_string(),
            category: category.to_string(),
            target_path: target_path.map(|p| p.display().to_string()),
            outcome,
            detail,
            timestamp: Utc::now(),
        });
    }

    pub fn records(&self) -> &[AssignmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One tab-delimited line per record, human-readable
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                record.timestamp.to_rfc3339(),
                record.outcome.as_str(),
                record.identifier,
                record.category,
                record.source_path,
                record.target_path.as_deref().unwrap_or("-"),
                record.detail.as_deref().unwrap_or("-"),
            ));
        }
        out
    }

    /// Append the rendered records to the log file, creating it (and its
    /// parent directory) on first use.
    pub async fn flush(&self, log_path: &Path) -> Result<()> {
        if self.records.is_empty() {
            return Ok(());
        }

        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::DestinationWrite {
                    path: parent.display().to_string(),
                    kind: e.kind(),
                    message: e.to_string(),
                })?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .await
            .map_err(|e| AppError::DestinationWrite {
                path: log_path.display().to_string(),
                kind: e.kind(),
                message: e.to_string(),
            })?;

        file.write_all(self.render().as_bytes())
            .await
            .map_err(|e| AppError::DestinationWrite {
                path: log_path.display().to_string(),
                kind: e.kind(),
                message: e.to_string(),
            })?;
        file.flush().await.map_err(|e| AppError::DestinationWrite {
            path: log_path.display().to_string(),
            kind: e.kind(),
            message: e.to_string(),
        })?;

        tracing::info!("Flushed {} records to {}", self.records.len(), log_path.display());
        Ok(())
    }
}
