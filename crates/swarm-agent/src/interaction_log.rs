//! Interaction Log - append-only record of every model call
//!
//! Each line of the log file is one JSON [`InteractionRecord`]: which agent
//! acted, with which model, what kind of action it was, the prompt it sent,
//! the text it got back (or the error), and a status tag. Lifecycle events
//! (startup, final report, fatal errors) are recorded the same way.
//!
//! The log is an explicit handle: whoever needs to record interactions is
//! given an [`InteractionLog`] at construction time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use swarm_core::fail_open::fail_open;
use swarm_core::{ActionType, InteractionStatus, Result, SwarmError};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Maximum prompt/response characters shown by [`InteractionRecord::summary`]
const SUMMARY_PREVIEW_CHARS: usize = 80;

/// One logged interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub agent_name: String,
    pub model_used: String,
    pub action: ActionType,
    pub input_prompt: String,
    pub output_response: String,
    pub status: InteractionStatus,
}

impl InteractionRecord {
    pub fn new(
        agent_name: impl Into<String>,
        model_used: impl Into<String>,
        action: ActionType,
        input_prompt: impl Into<String>,
        output_response: impl Into<String>,
        status: InteractionStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            agent_name: agent_name.into(),
            model_used: model_used.into(),
            action,
            input_prompt: input_prompt.into(),
            output_response: output_response.into(),
            status,
        }
    }

    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} [{}] {} ({}) {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.status,
            self.agent_name,
            self.model_used,
            self.action,
            preview(&self.output_response, SUMMARY_PREVIEW_CHARS)
        )
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > max_chars {
        let truncated: String = single_line.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        single_line
    }
}

/// Handle to the append-only interaction log file
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record, creating the file and its parent directory as needed
    pub async fn append(&self, record: &InteractionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Record an interaction
    ///
    /// This operation is fail-open - a broken log never aborts the run
    pub async fn record(
        &self,
        agent_name: &str,
        model_used: &str,
        action: ActionType,
        input_prompt: &str,
        output_response: &str,
        status: InteractionStatus,
    ) {
        let record = InteractionRecord::new(
            agent_name,
            model_used,
            action,
            input_prompt,
            output_response,
            status,
        );
        fail_open("interaction_log::record", || self.append(&record)).await;
    }

    /// Read every record in the log; a missing file is an empty log
    pub async fn read_all(&self) -> Result<Vec<InteractionRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SwarmError::Io(e)),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(SwarmError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let log = InteractionLog::new(temp_dir.path().join("logs/experiment_data.jsonl"));

        log.record(
            "Auditor",
            "mistral-small-latest",
            ActionType::Analysis,
            "audit this",
            "looks fine",
            InteractionStatus::Success,
        )
        .await;
        log.record(
            "Fixer",
            "mistral-small-latest",
            ActionType::Fix,
            "fix this",
            "ERROR: boom",
            InteractionStatus::Failure,
        )
        .await;

        let records = log.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].agent_name, "Auditor");
        assert_eq!(records[0].action, ActionType::Analysis);
        assert_eq!(records[1].status, InteractionStatus::Failure);
        assert_eq!(records[1].input_prompt, "fix this");
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn test_append_only() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log.jsonl");

        let first = InteractionLog::new(&path);
        first
            .record("System", "N/A", ActionType::Analysis, "start", "ready", InteractionStatus::Success)
            .await;

        // A second handle on the same file keeps earlier records
        let second = InteractionLog::new(&path);
        second
            .record("System", "N/A", ActionType::Debug, "stop", "bye", InteractionStatus::Success)
            .await;

        assert_eq!(second.read_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = InteractionLog::new(temp_dir.path().join("absent.jsonl"));
        assert!(log.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_log_fails_open() {
        let temp_dir = TempDir::new().unwrap();
        // The log path is a directory, so appends fail
        let log = InteractionLog::new(temp_dir.path());
        log.record("System", "N/A", ActionType::Debug, "x", "y", InteractionStatus::Failure)
            .await;
    }

    #[test]
    fn test_summary_truncates() {
        let record = InteractionRecord::new(
            "Generator",
            "m",
            ActionType::Generation,
            "p",
            "y".repeat(200),
            InteractionStatus::Success,
        );
        let summary = record.summary();
        assert!(summary.contains("[SUCCESS] Generator (m) GENERATION"));
        assert!(summary.ends_with("..."));
        assert!(!summary.contains(&"y".repeat(81)));
    }
}
